//! Database migrations for document service

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_document_counters::Migration),
            Box::new(m20250301_000002_create_documents::Migration),
            Box::new(m20250301_000003_create_status_history::Migration),
        ]
    }
}

mod m20250301_000001_create_document_counters {
    use super::*;

    /// One live counter per (tenant, type, series, year); NULL years compare
    /// equal through COALESCE and retired rows are excluded.
    const LIVE_KEY_INDEX: &str = r#"CREATE UNIQUE INDEX IF NOT EXISTS "ux_document_counters_live_key"
        ON "document_counters" ("tenant_id", "document_type_id", "series", COALESCE("year", 0))
        WHERE "deleted_at" IS NULL"#;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_document_counters"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DocumentCounters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DocumentCounters::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DocumentCounters::TenantId).uuid().not_null())
                        .col(
                            ColumnDef::new(DocumentCounters::DocumentTypeId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentCounters::Series)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(DocumentCounters::Year).integer())
                        .col(
                            ColumnDef::new(DocumentCounters::CurrentValue)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(DocumentCounters::Prefix).string())
                        .col(
                            ColumnDef::new(DocumentCounters::PaddingLength)
                                .small_integer()
                                .not_null()
                                .default(5),
                        )
                        .col(ColumnDef::new(DocumentCounters::FormatPattern).string())
                        .col(
                            ColumnDef::new(DocumentCounters::ResetOnYearChange)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(DocumentCounters::Notes).text())
                        .col(
                            ColumnDef::new(DocumentCounters::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(ColumnDef::new(DocumentCounters::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(DocumentCounters::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(ColumnDef::new(DocumentCounters::UpdatedBy).string().not_null())
                        .col(
                            ColumnDef::new(DocumentCounters::DeletedAt)
                                .timestamp_with_time_zone(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_document_counters_stream")
                        .table(DocumentCounters::Table)
                        .col(DocumentCounters::TenantId)
                        .col(DocumentCounters::DocumentTypeId)
                        .col(DocumentCounters::Series)
                        .to_owned(),
                )
                .await?;

            manager
                .get_connection()
                .execute_unprepared(LIVE_KEY_INDEX)
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DocumentCounters::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DocumentCounters {
        Table,
        Id,
        TenantId,
        DocumentTypeId,
        Series,
        Year,
        CurrentValue,
        Prefix,
        PaddingLength,
        FormatPattern,
        ResetOnYearChange,
        Notes,
        CreatedAt,
        CreatedBy,
        UpdatedAt,
        UpdatedBy,
        DeletedAt,
    }
}

mod m20250301_000002_create_documents {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_documents"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Documents::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Documents::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Documents::TenantId).uuid().not_null())
                        .col(
                            ColumnDef::new(Documents::Status)
                                .string_len(16)
                                .not_null()
                                .default("DRAFT"),
                        )
                        .col(ColumnDef::new(Documents::Number).string())
                        .col(ColumnDef::new(Documents::BusinessPartyId).uuid())
                        .col(ColumnDef::new(Documents::DocumentTypeId).uuid())
                        .col(ColumnDef::new(Documents::ClosedAt).timestamp_with_time_zone())
                        .col(
                            ColumnDef::new(Documents::Version)
                                .big_integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Documents::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(ColumnDef::new(Documents::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(Documents::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(ColumnDef::new(Documents::UpdatedBy).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DocumentRows::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DocumentRows::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DocumentRows::DocumentId).uuid().not_null())
                        .col(ColumnDef::new(DocumentRows::Position).integer().not_null())
                        .col(ColumnDef::new(DocumentRows::Description).string().not_null())
                        .col(
                            ColumnDef::new(DocumentRows::Quantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentRows::UnitPrice)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentRows::VatRate)
                                .decimal_len(7, 4)
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_document_rows_document")
                                .from(DocumentRows::Table, DocumentRows::DocumentId)
                                .to(Documents::Table, Documents::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_documents_tenant")
                        .table(Documents::Table)
                        .col(Documents::TenantId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_document_rows_document")
                        .table(DocumentRows::Table)
                        .col(DocumentRows::DocumentId)
                        .col(DocumentRows::Position)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DocumentRows::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Documents::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Documents {
        Table,
        Id,
        TenantId,
        Status,
        Number,
        BusinessPartyId,
        DocumentTypeId,
        ClosedAt,
        Version,
        CreatedAt,
        CreatedBy,
        UpdatedAt,
        UpdatedBy,
    }

    #[derive(DeriveIden)]
    enum DocumentRows {
        Table,
        Id,
        DocumentId,
        Position,
        Description,
        Quantity,
        UnitPrice,
        VatRate,
    }
}

mod m20250301_000003_create_status_history {
    use super::m20250301_000002_create_documents::Documents;
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_status_history"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DocumentStatusHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DocumentStatusHistory::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(DocumentStatusHistory::DocumentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentStatusHistory::TenantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentStatusHistory::FromStatus)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentStatusHistory::ToStatus)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DocumentStatusHistory::Reason).text())
                        .col(
                            ColumnDef::new(DocumentStatusHistory::ChangedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentStatusHistory::ChangedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(ColumnDef::new(DocumentStatusHistory::ClientIp).string_len(64))
                        .col(ColumnDef::new(DocumentStatusHistory::UserAgent).text())
                        .col(
                            ColumnDef::new(DocumentStatusHistory::DocumentVersion)
                                .big_integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_status_history_document")
                                .from(DocumentStatusHistory::Table, DocumentStatusHistory::DocumentId)
                                .to(Documents::Table, Documents::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_status_history_document")
                        .table(DocumentStatusHistory::Table)
                        .col(DocumentStatusHistory::DocumentId)
                        .col(DocumentStatusHistory::ChangedAt)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DocumentStatusHistory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DocumentStatusHistory {
        Table,
        Id,
        DocumentId,
        TenantId,
        FromStatus,
        ToStatus,
        Reason,
        ChangedBy,
        ChangedAt,
        ClientIp,
        UserAgent,
        DocumentVersion,
    }
}
