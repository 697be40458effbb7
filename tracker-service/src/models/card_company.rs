//! Card-company reference data and issuer detection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Card-issuer codes supported by the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssuerCode {
    Hyundai,
    Shinhan,
    Samsung,
    Lotte,
    Kb,
    Woori,
    Hana,
    Nh,
    Unknown,
}

/// Keyword aliases per issuer, native script and Latin. Order matters:
/// detection is first-match-wins over this table, not best-match.
const ISSUER_ALIASES: &[(IssuerCode, &[&str])] = &[
    (IssuerCode::Hyundai, &["현대", "hyundai"]),
    (IssuerCode::Shinhan, &["신한", "shinhan"]),
    (IssuerCode::Samsung, &["삼성", "samsung"]),
    (IssuerCode::Lotte, &["롯데", "lotte"]),
    (IssuerCode::Kb, &["국민", "kb", "kookmin"]),
    (IssuerCode::Woori, &["우리", "woori"]),
    (IssuerCode::Hana, &["하나", "hana"]),
    (IssuerCode::Nh, &["nh", "농협", "nonghyup"]),
];

impl IssuerCode {
    /// Detect the issuer from free text: an uploaded filename or an email
    /// `From` header. Total function, returns `Unknown` when nothing matches.
    pub fn detect(text: &str) -> Self {
        let lowered = text.to_lowercase();
        for (code, aliases) in ISSUER_ALIASES {
            if aliases.iter().any(|alias| lowered.contains(alias)) {
                return *code;
            }
        }
        IssuerCode::Unknown
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssuerCode::Hyundai => "HYUNDAI",
            IssuerCode::Shinhan => "SHINHAN",
            IssuerCode::Samsung => "SAMSUNG",
            IssuerCode::Lotte => "LOTTE",
            IssuerCode::Kb => "KB",
            IssuerCode::Woori => "WOORI",
            IssuerCode::Hana => "HANA",
            IssuerCode::Nh => "NH",
            IssuerCode::Unknown => "UNKNOWN",
        }
    }

    /// Parse a stored company code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "HYUNDAI" => Some(IssuerCode::Hyundai),
            "SHINHAN" => Some(IssuerCode::Shinhan),
            "SAMSUNG" => Some(IssuerCode::Samsung),
            "LOTTE" => Some(IssuerCode::Lotte),
            "KB" => Some(IssuerCode::Kb),
            "WOORI" => Some(IssuerCode::Woori),
            "HANA" => Some(IssuerCode::Hana),
            "NH" => Some(IssuerCode::Nh),
            "UNKNOWN" => Some(IssuerCode::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for IssuerCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Card-company reference row. Soft-deleted via `is_active`: transactions
/// hold a non-nullable foreign key to it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CardCompany {
    pub card_company_id: Uuid,
    pub company_name: String,
    pub company_code: String,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

impl CardCompany {
    pub fn new(company_name: String, code: IssuerCode) -> Self {
        Self {
            card_company_id: Uuid::new_v4(),
            company_name,
            company_code: code.as_str().to_string(),
            is_active: true,
            created_utc: Utc::now(),
        }
    }
}
