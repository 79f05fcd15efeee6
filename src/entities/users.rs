use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Practice (tenant) this user belongs to. Every appointment lookup
    /// is co-constrained by this value.
    pub practice_id: String,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Random API key (64-char hex string)
    pub api_key: String,

    /// Two-factor authentication fully enabled for this user.
    pub mfa_enabled: bool,

    /// A TOTP secret has been generated but not yet confirmed.
    pub mfa_pending: bool,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::user_mfa::Entity")]
    UserMfa,
}

impl Related<super::user_mfa::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserMfa.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
