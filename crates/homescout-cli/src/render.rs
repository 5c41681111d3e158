// SPDX-License-Identifier: AGPL-3.0
// Homescout CLI - Text rendering for listings and the profile

use homescout_core::{Property, Session, Stats};

/// Listing card: heart marker, price, title, location and facts
pub fn property_card(property: &Property, is_saved: bool) -> String {
    let heart = if is_saved { "♥" } else { "♡" };
    let mut out = format!(
        "{} {}  {}{}\n",
        heart,
        property.formatted_price(),
        property.title,
        if property.featured { "  [Featured]" } else { "" }
    );

    out.push_str(&format!("   {}\n", property.location_line()));
    out.push_str(&format!(
        "   {} bd · {} ba · {} sqft · {}",
        property.bedrooms, property.bathrooms, property.square_feet, property.property_type
    ));
    if property.rating > 0.0 {
        out.push_str(&format!(
            " · ★ {:.1} ({})",
            property.rating, property.review_count
        ));
    }
    out.push_str(&format!("\n   id: {}", property.id));
    out
}

/// Profile header and the three activity counters
pub fn profile(session: &Session, stats: &Stats) -> String {
    let email = if session.email.is_empty() {
        "(no email)"
    } else {
        session.email.as_str()
    };

    format!(
        "[{}] {}\n\n  Saved      {}\n  Viewed     {}\n  Inquiries  {}",
        session.avatar_initial(),
        email,
        stats.saved,
        stats.viewed,
        stats.inquiries
    )
}
