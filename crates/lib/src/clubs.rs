//! Static club catalogue.
//!
//! Clubs are not stored remotely; events and announcements reference them by
//! [`Club::id`].

/// Icon shown next to a club's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClubIcon {
    Code,
    HelpCircle,
    Mic,
    Drama,
    Music,
}

impl ClubIcon {
    /// Single-glyph rendering for text front ends.
    pub fn glyph(&self) -> &'static str {
        match self {
            ClubIcon::Code => "</>",
            ClubIcon::HelpCircle => "(?)",
            ClubIcon::Mic => "(m)",
            ClubIcon::Drama => "(d)",
            ClubIcon::Music => "(~)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Club {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: ClubIcon,
}

/// Every club, in display order.
pub const CLUBS: [Club; 5] = [
    Club {
        id: "finite-loop",
        name: "Finite Loop Club",
        icon: ClubIcon::Code,
    },
    Club {
        id: "grey-matter",
        name: "Grey Matter",
        icon: ClubIcon::HelpCircle,
    },
    Club {
        id: "saca",
        name: "SACA",
        icon: ClubIcon::Mic,
    },
    Club {
        id: "taaleem",
        name: "Taaleem",
        icon: ClubIcon::Drama,
    },
    Club {
        id: "stereo",
        name: "Stereo",
        icon: ClubIcon::Music,
    },
];

/// Club the dashboard opens on.
pub const DEFAULT_CLUB: &str = "finite-loop";

/// Attribution used for content whose club id is not in the catalogue.
pub const GENERAL: &str = "General";

pub fn find(id: &str) -> Option<&'static Club> {
    CLUBS.iter().find(|club| club.id == id)
}

/// Display name for `id`, or [`GENERAL`] for unknown ids.
pub fn display_name(id: &str) -> &'static str {
    find(id).map(|club| club.name).unwrap_or(GENERAL)
}

/// Position of `id` in [`CLUBS`].
pub fn position(id: &str) -> Option<usize> {
    CLUBS.iter().position(|club| club.id == id)
}
