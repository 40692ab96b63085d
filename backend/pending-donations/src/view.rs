//! Render projection of [`ViewState`]: what the screen shows, independent
//! of any widget toolkit.

use std::fmt;

use crate::donation::{DonationRecord, VolunteerRemark};
use crate::screen::ViewState;

pub const HEADING: &str = "New Collection Request";
pub const EMPTY_PLACEHOLDER: &str = "No Ongoing Events";
pub const PICKER_PLACEHOLDER: &str = "Select Status";
pub const INVALID_DATE: &str = "Invalid Date";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenView {
    /// Spinner only.
    Loading,
    Ready {
        /// Last fetch error, shown above the list.
        error: Option<String>,
        body: Body,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Placeholder(&'static str),
    Cards(Vec<DonationCard>),
}

/// Badge colour: yellow while pending, green otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Pending,
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub text: String,
    pub tone: BadgeTone,
}

impl Badge {
    fn new(prefix: &str, label: &str) -> Self {
        Self {
            text: format!("{prefix}: {label}"),
            tone: if label == "pending" {
                BadgeTone::Pending
            } else {
                BadgeTone::Settled
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerOption {
    pub label: &'static str,
    /// `None` for the placeholder entry.
    pub value: Option<VolunteerRemark>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardControl {
    EditButton,
    StatusPicker(Vec<PickerOption>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationCard {
    /// Record id; list key.
    pub key: String,
    pub title: String,
    pub type_line: String,
    pub date_line: String,
    pub avatar_url: Option<String>,
    pub donor_line: String,
    pub location_line: String,
    pub admin_badge: Badge,
    pub volunteer_badge: Badge,
    pub control: CardControl,
}

impl ScreenView {
    pub fn cards(&self) -> &[DonationCard] {
        match self {
            Self::Ready {
                body: Body::Cards(cards),
                ..
            } => cards.as_slice(),
            _ => &[],
        }
    }

    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Ready {
                body: Body::Placeholder(text),
                ..
            } => Some(*text),
            _ => None,
        }
    }
}

/// The picker entries, placeholder first.
pub fn picker_options() -> Vec<PickerOption> {
    std::iter::once(PickerOption {
        label: PICKER_PLACEHOLDER,
        value: None,
    })
    .chain(VolunteerRemark::ALL.iter().map(|r| PickerOption {
        label: r.label(),
        value: Some(*r),
    }))
    .collect()
}

/// Project the state into a view. `image_url` resolves a profile image
/// reference to a URL.
pub fn render<F>(state: &ViewState, image_url: F) -> ScreenView
where
    F: Fn(&str) -> String,
{
    if state.loading {
        return ScreenView::Loading;
    }

    let body = if state.donations.is_empty() {
        Body::Placeholder(EMPTY_PLACEHOLDER)
    } else {
        Body::Cards(
            state
                .donations
                .iter()
                .map(|d| card(d, state.editing.as_deref() == Some(d.id.as_str()), &image_url))
                .collect(),
        )
    };

    ScreenView::Ready {
        error: state.error.clone(),
        body,
    }
}

fn card<F>(d: &DonationRecord, editing: bool, image_url: &F) -> DonationCard
where
    F: Fn(&str) -> String,
{
    DonationCard {
        key: d.id.clone(),
        title: d.title.clone(),
        type_line: format!("Type: {}", d.donation_type),
        date_line: match d.created_at {
            Some(created) => format!("Date: {}", created.format("%d/%m/%Y")),
            None => format!("Date: {INVALID_DATE}"),
        },
        avatar_url: d.donor.profile_image.as_deref().map(image_url),
        donor_line: format!("{} (Donor)", d.donor.display_name()),
        location_line: format!("Location: {}", d.location),
        admin_badge: Badge::new("Admin", d.admin_remark.as_str()),
        volunteer_badge: Badge::new("Volunteer", d.volunteer_remark.as_str()),
        control: if editing {
            CardControl::StatusPicker(picker_options())
        } else {
            CardControl::EditButton
        },
    }
}

impl fmt::Display for ScreenView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => writeln!(f, "Loading..."),
            Self::Ready { error, body } => {
                writeln!(f, "{HEADING}")?;
                if let Some(err) = error {
                    writeln!(f, "! {err}")?;
                }
                match body {
                    Body::Placeholder(text) => writeln!(f, "  {text}"),
                    Body::Cards(cards) => cards.iter().try_for_each(|c| write!(f, "{c}")),
                }
            }
        }
    }
}

impl fmt::Display for DonationCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] {}", self.key, self.title)?;
        writeln!(f, "  {}", self.type_line)?;
        writeln!(f, "  {}", self.date_line)?;
        match &self.avatar_url {
            Some(url) => writeln!(f, "  {} <{url}>", self.donor_line)?,
            None => writeln!(f, "  {}", self.donor_line)?,
        }
        writeln!(f, "  {}", self.location_line)?;
        writeln!(f, "  {} | {}", self.admin_badge, self.volunteer_badge)?;
        match &self.control {
            CardControl::EditButton => writeln!(f, "  [Edit]"),
            CardControl::StatusPicker(options) => {
                let labels: Vec<_> = options.iter().map(|o| o.label).collect();
                writeln!(f, "  Status: {}", labels.join(" / "))
            }
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tone {
            BadgeTone::Pending => write!(f, "({})", self.text),
            BadgeTone::Settled => write!(f, "<{}>", self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::donation::{AdminRemark, Donor};

    fn record(id: &str, admin: &str, remark: VolunteerRemark) -> DonationRecord {
        DonationRecord {
            id: id.to_string(),
            title: "Rice bags".to_string(),
            donation_type: "Food".to_string(),
            created_at: Some(Utc.with_ymd_and_hms(2024, 12, 5, 18, 45, 0).unwrap()),
            location: "Kolhapur".to_string(),
            donor: Donor {
                first_name: "Meera".to_string(),
                last_name: "Joshi".to_string(),
                profile_image: Some("meera.png".to_string()),
            },
            admin_remark: AdminRemark(admin.to_string()),
            volunteer_remark: remark,
        }
    }

    fn url(reference: &str) -> String {
        format!("http://files/upload-file/{reference}")
    }

    fn ready(donations: Vec<DonationRecord>, editing: Option<&str>) -> ViewState {
        ViewState {
            donations,
            editing: editing.map(String::from),
            loading: false,
            error: None,
            focused: true,
        }
    }

    #[test]
    fn loading_shows_spinner_only() {
        let state = ViewState {
            loading: true,
            ..ready(vec![record("a", "pending", VolunteerRemark::Pending)], None)
        };
        let view = render(&state, url);
        assert_eq!(view, ScreenView::Loading);
        assert!(view.cards().is_empty());
    }

    #[test]
    fn empty_list_shows_placeholder() {
        let view = render(&ready(Vec::new(), None), url);
        assert_eq!(view.placeholder(), Some("No Ongoing Events"));
        assert!(view.cards().is_empty());
        assert!(view.to_string().contains("No Ongoing Events"));
    }

    #[test]
    fn card_lines() {
        let view = render(
            &ready(vec![record("a", "approved", VolunteerRemark::Pending)], None),
            url,
        );
        let card = &view.cards()[0];
        assert_eq!(card.key, "a");
        assert_eq!(card.type_line, "Type: Food");
        assert_eq!(card.date_line, "Date: 05/12/2024");
        assert_eq!(card.donor_line, "Meera Joshi (Donor)");
        assert_eq!(card.avatar_url.as_deref(), Some("http://files/upload-file/meera.png"));
        assert_eq!(card.location_line, "Location: Kolhapur");
        assert_eq!(card.admin_badge.text, "Admin: approved");
        assert_eq!(card.admin_badge.tone, BadgeTone::Settled);
        assert_eq!(card.volunteer_badge.text, "Volunteer: pending");
        assert_eq!(card.volunteer_badge.tone, BadgeTone::Pending);
        assert_eq!(card.control, CardControl::EditButton);
    }

    #[test]
    fn cards_follow_record_order() {
        let view = render(
            &ready(
                vec![
                    record("z", "pending", VolunteerRemark::Pending),
                    record("m", "pending", VolunteerRemark::Received),
                ],
                None,
            ),
            url,
        );
        let keys: Vec<_> = view.cards().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["z", "m"]);
        assert_eq!(view.placeholder(), None);
    }

    #[test]
    fn only_edited_card_shows_picker() {
        let view = render(
            &ready(
                vec![
                    record("a", "pending", VolunteerRemark::Pending),
                    record("b", "pending", VolunteerRemark::Pending),
                ],
                Some("b"),
            ),
            url,
        );
        assert_eq!(view.cards()[0].control, CardControl::EditButton);
        assert_eq!(
            view.cards()[1].control,
            CardControl::StatusPicker(picker_options())
        );
    }

    #[test]
    fn picker_lists_placeholder_then_statuses() {
        let labels: Vec<_> = picker_options().iter().map(|o| o.label).collect();
        assert_eq!(
            labels,
            ["Select Status", "Pending", "Rejected", "Received", "Delivered"]
        );
        assert_eq!(picker_options()[0].value, None);
        assert_eq!(picker_options()[4].value, Some(VolunteerRemark::Delivered));
    }

    #[test]
    fn error_is_rendered_above_list() {
        let mut state = ready(vec![record("a", "pending", VolunteerRemark::Pending)], None);
        state.error = Some("Service error (500): down".to_string());
        let text = render(&state, url).to_string();
        assert!(text.starts_with("New Collection Request\n! Service error (500): down\n"));
        assert!(text.contains("[a] Rice bags"));
    }

    #[test]
    fn unknown_date_still_renders_card() {
        let mut rec = record("a", "pending", VolunteerRemark::Pending);
        rec.created_at = None;
        let view = render(&ready(vec![rec], None), url);
        assert_eq!(view.cards().len(), 1);
        assert_eq!(view.cards()[0].date_line, "Date: Invalid Date");
    }

    #[test]
    fn missing_avatar_omitted() {
        let mut rec = record("a", "pending", VolunteerRemark::Pending);
        rec.donor.profile_image = None;
        let view = render(&ready(vec![rec], None), url);
        assert_eq!(view.cards()[0].avatar_url, None);
    }
}
