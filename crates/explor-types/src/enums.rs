//! Enumeration types for the Explor client.
//!
//! Everything here is serialized as the lowercase string the browser front
//! end stores and compares against, so persisted blobs written by older
//! builds keep parsing.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ts_rs::TS;

use crate::ids::DepartmentId;

/// Error returned when a string does not name a known enum member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    /// The enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} value: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Implements `as_str`, `Display` and `FromStr` for a fieldless string enum.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The wire/storage spelling of this member.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Explore controls
// ---------------------------------------------------------------------------

/// Ordering applied to explore results on the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum SortBy {
    /// Keep the order the collection API returned.
    #[default]
    Relevance,
    /// Title, ascending.
    Title,
    /// Artist name, ascending.
    Artist,
    /// Date text, descending.
    Newest,
}

string_enum!(SortBy, "sortBy", {
    Relevance => "relevance",
    Title => "title",
    Artist => "artist",
    Newest => "newest",
});

/// Layout of the explore result grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ViewMode {
    /// Masonry-style tiles of mixed sizes.
    #[default]
    Bento,
    /// One artwork per row.
    List,
}

string_enum!(ViewMode, "viewMode", {
    Bento => "bento",
    List => "list",
});

/// Department facet of the explore controls: everything, or one department.
///
/// Stored as the string `"all"` or the department id rendered as decimal
/// text, matching the filter chip ids of the explore screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DepartmentFilter {
    /// No department restriction.
    #[default]
    All,
    /// Restrict results to a single department.
    Department(DepartmentId),
}

impl DepartmentFilter {
    /// The department to pass to the search endpoint, if any.
    pub const fn department_id(self) -> Option<DepartmentId> {
        match self {
            Self::All => None,
            Self::Department(id) => Some(id),
        }
    }
}

impl fmt::Display for DepartmentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Department(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for DepartmentFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(Self::All);
        }
        s.trim()
            .parse::<u64>()
            .ok()
            .map(|id| Self::Department(DepartmentId(id)))
            .ok_or_else(|| UnknownVariant {
                kind: "departmentId",
                value: s.to_owned(),
            })
    }
}

impl Serialize for DepartmentFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DepartmentFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Navigation and screen state
// ---------------------------------------------------------------------------

/// Bottom-navigation tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Tab {
    /// Landing page with featured artworks.
    #[default]
    Home,
    /// Search and browse.
    Explore,
    /// Museum map with department zones.
    Map,
    /// Ticket sessions.
    Tickets,
    /// Account, favorites and saved routes.
    Profile,
}

string_enum!(Tab, "tab", {
    Home => "home",
    Explore => "explore",
    Map => "map",
    Tickets => "tickets",
    Profile => "profile",
});

/// Screens that report a load status to the state container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Screen {
    /// Landing page.
    Home,
    /// Search and browse.
    Explore,
    /// Museum map.
    Map,
    /// Ticket sessions.
    Tickets,
    /// Account page.
    Profile,
}

string_enum!(Screen, "screen", {
    Home => "home",
    Explore => "explore",
    Map => "map",
    Tickets => "tickets",
    Profile => "profile",
});

/// Load status of a screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ScreenStatus {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A request is in flight.
    Loading,
    /// Results are on screen.
    Success,
    /// The request finished with nothing to show.
    Empty,
    /// The request failed.
    Error,
}

string_enum!(ScreenStatus, "status", {
    Idle => "idle",
    Loading => "loading",
    Success => "success",
    Empty => "empty",
    Error => "error",
});

/// Colour theme mirrored to the document and the theme preference key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Theme {
    /// Light palette.
    #[default]
    Light,
    /// Dark palette.
    Dark,
}

string_enum!(Theme, "theme", {
    Light => "light",
    Dark => "dark",
});

impl Theme {
    /// Theme for a dark-mode flag.
    pub const fn from_dark_mode(dark: bool) -> Self {
        if dark { Self::Dark } else { Self::Light }
    }

    /// Whether this is the dark palette.
    pub const fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }
}
