use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The two attendance events a code or record can represent.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Deserialize,
    Serialize,
)]
#[serde(rename_all = "kebab-case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SessionKind {
    #[sea_orm(string_value = "check-in")]
    CheckIn,

    #[sea_orm(string_value = "check-out")]
    CheckOut,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::CheckIn => "check-in",
            SessionKind::CheckOut => "check-out",
        }
    }

    /// Phrase used in confirmation messages, e.g. "checked in".
    pub fn past_tense(&self) -> &'static str {
        match self {
            SessionKind::CheckIn => "checked in",
            SessionKind::CheckOut => "checked out",
        }
    }
}
