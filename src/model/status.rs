//! Status codes for forms, travelers and binders
//!
//! The numeric codes are the canonical values stored by existing
//! deployments and must not be renumbered.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $code:expr => $label:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "f64", into = "f64")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every status in lifecycle order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical numeric code
            pub fn code(self) -> f64 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            /// Look up a status by its numeric code
            pub fn from_code(code: f64) -> Option<Self> {
                Self::ALL.iter().copied().find(|s| s.code() == code)
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl TryFrom<f64> for $name {
            type Error = String;

            fn try_from(code: f64) -> Result<Self, Self::Error> {
                Self::from_code(code)
                    .ok_or_else(|| format!("unknown {} code {}", stringify!($name), code))
            }
        }

        impl From<$name> for f64 {
            fn from(status: $name) -> Self {
                status.code()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} ({})", self.label(), self.code())
            }
        }
    };
}

status_enum! {
    /// Form template status
    FormStatus {
        Editable = 0.0 => "editable",
        Ready = 0.5 => "ready to publish",
        Published = 1.0 => "published",
        Obsolete = 2.0 => "obsolete",
    }
}

status_enum! {
    /// Traveler work-record status
    TravelerStatus {
        Initialized = 0.0 => "initialized",
        Active = 1.0 => "active",
        SubmittedForCompletion = 1.5 => "submitted for completion",
        Completed = 2.0 => "completed",
        Frozen = 3.0 => "frozen",
    }
}

status_enum! {
    /// Binder work-package status
    BinderStatus {
        New = 0.0 => "new",
        Active = 1.0 => "active",
        Completed = 2.0 => "completed",
    }
}

impl Default for FormStatus {
    fn default() -> Self {
        FormStatus::Editable
    }
}

impl Default for TravelerStatus {
    fn default() -> Self {
        TravelerStatus::Initialized
    }
}

impl Default for BinderStatus {
    fn default() -> Self {
        BinderStatus::New
    }
}
