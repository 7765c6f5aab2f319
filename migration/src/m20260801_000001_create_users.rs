use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Users::Table)
          .if_not_exists()
          .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
          .col(ColumnDef::new(Users::Email).string().not_null())
          .col(ColumnDef::new(Users::ReferralCode).string().not_null())
          .col(
            ColumnDef::new(Users::Entries).integer().not_null().default(1),
          )
          .col(
            ColumnDef::new(Users::UserType)
              .string()
              .not_null()
              .default("client"),
          )
          .col(ColumnDef::new(Users::ReferredBy).string().null())
          .col(
            ColumnDef::new(Users::EmailVerified)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(Users::VerificationToken).string().null())
          .col(
            ColumnDef::new(Users::VerificationTokenExpiry).date_time().null(),
          )
          .col(
            ColumnDef::new(Users::VerificationEmailSentAt).date_time().null(),
          )
          .col(ColumnDef::new(Users::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_users_email")
          .table(Users::Table)
          .col(Users::Email)
          .unique()
          .to_owned(),
      )
      .await?;

    // Unique constraint closes the check-then-insert race on code allocation
    manager
      .create_index(
        Index::create()
          .name("idx_users_referral_code")
          .table(Users::Table)
          .col(Users::ReferralCode)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Users::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Users {
  Table,
  Id,
  Email,
  ReferralCode,
  Entries,
  UserType,
  ReferredBy,
  EmailVerified,
  VerificationToken,
  VerificationTokenExpiry,
  VerificationEmailSentAt,
  CreatedAt,
}
