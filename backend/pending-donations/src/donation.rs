//! Donation records as the volunteer screen sees them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status a volunteer assigns to a donation pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolunteerRemark {
    Pending,
    Rejected,
    Received,
    Delivered,
}

impl VolunteerRemark {
    /// Every value the picker offers, in display order.
    pub const ALL: [VolunteerRemark; 4] = [
        Self::Pending,
        Self::Rejected,
        Self::Received,
        Self::Delivered,
    ];

    /// Parse the wire / path-segment form. Returns `None` for anything else.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "rejected" => Some(Self::Rejected),
            "received" => Some(Self::Received),
            "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }

    /// Value used on the wire and in the update URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rejected => "rejected",
            Self::Received => "received",
            Self::Delivered => "delivered",
        }
    }

    /// Label shown in the status picker.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Rejected => "Rejected",
            Self::Received => "Received",
            Self::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for VolunteerRemark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remark set by an administrator. Opaque to the volunteer; only used for
/// badge colouring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminRemark(pub String);

impl AdminRemark {
    pub fn is_pending(&self) -> bool {
        self.0 == "pending"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donor {
    pub first_name: String,
    pub last_name: String,
    /// File reference resolved through `GET {base}/upload-file/{ref}`.
    pub profile_image: Option<String>,
}

impl Donor {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A pending donation as returned by the service. Never mutated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecord {
    pub id: String,
    pub title: String,
    pub donation_type: String,
    /// `None` when the service sent no readable creation date.
    pub created_at: Option<DateTime<Utc>>,
    pub location: String,
    pub donor: Donor,
    pub admin_remark: AdminRemark,
    pub volunteer_remark: VolunteerRemark,
}
