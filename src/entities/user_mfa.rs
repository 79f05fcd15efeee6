use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_mfa")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,

    /// Base32-encoded TOTP shared secret. Only leaves the server once,
    /// in the setup response.
    pub secret: String,

    pub is_enabled: bool,

    pub enabled_at: Option<String>,

    /// JSON array of SHA-256 hex digests of the backup codes.
    pub backup_codes: String,

    pub failed_attempts: i32,

    /// RFC 3339; verification is refused until this passes.
    pub locked_until: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
