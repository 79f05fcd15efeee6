use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "appointments")]
pub struct Model {
    /// UUID, assigned at creation.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Tenant scope; every lookup filters on (id, practice_id).
    pub practice_id: String,

    pub patient_name: String,

    pub clinician: Option<String>,

    /// RFC 3339 start time.
    pub scheduled_for: String,

    /// One of the `AppointmentStatus` display names; parsed at the
    /// service boundary, never trusted raw.
    pub status: String,

    pub cancelled_reason: Option<String>,

    pub cancelled_at: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::appointment_reminders::Entity")]
    AppointmentReminders,
}

impl Related<super::appointment_reminders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppointmentReminders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
