use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::models::application::{ApplicationRecord, ContactInfo};

pub const APPLICATION_ID_PREFIX: &str = "APP-";

/// `APP-` followed by 8 uppercase hex characters from a random v4 UUID.
///
/// Not checked for uniqueness here; the record store's unique key is the
/// authority and reports collisions as `PersistError::DuplicateId`.
pub fn generate_application_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{APPLICATION_ID_PREFIX}{}", hex[..8].to_uppercase())
}

/// Builds `ApplicationRecord`s. Holds only the public URL prefix for stored CVs,
/// so it is cheap to clone and safe to share across concurrent invocations.
#[derive(Debug, Clone)]
pub struct ApplicationBuilder {
    public_base_url: String,
}

impl ApplicationBuilder {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self { public_base_url }
    }

    /// Stable public reference for a stored document.
    pub fn cv_url(&self, container: &str, object_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url,
            container,
            object_id.trim_start_matches('/')
        )
    }

    pub fn build(&self, contact: ContactInfo, container: &str, object_id: &str) -> ApplicationRecord {
        self.build_at(contact, container, object_id, Utc::now())
    }

    /// Same as `build` with an explicit submission instant.
    ///
    /// Timestamps are truncated to microseconds, the precision Postgres keeps,
    /// so a stored record reads back equal to the one built.
    pub fn build_at(
        &self,
        contact: ContactInfo,
        container: &str,
        object_id: &str,
        submitted_at: DateTime<Utc>,
    ) -> ApplicationRecord {
        let ContactInfo { name, email, phone } = contact;
        ApplicationRecord {
            application_id: generate_application_id(),
            name,
            email,
            phone,
            cv_url: self.cv_url(container, object_id),
            submitted_at: submitted_at.trunc_subsecs(6),
        }
    }

    /// A copy of a not-yet-persisted record under a fresh application id.
    pub fn reissue(&self, record: &ApplicationRecord) -> ApplicationRecord {
        ApplicationRecord {
            application_id: generate_application_id(),
            ..record.clone()
        }
    }
}
