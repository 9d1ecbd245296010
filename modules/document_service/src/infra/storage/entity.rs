//! SeaORM entities for database tables

/// Numbering counters table
pub mod counter {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "document_counters")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,

        pub tenant_id: Uuid,

        pub document_type_id: Uuid,

        /// Series label, empty for the default series
        pub series: String,

        /// NULL when the stream is not year-scoped
        pub year: Option<i32>,

        pub current_value: i64,

        pub prefix: Option<String>,

        pub padding_length: i16,

        pub format_pattern: Option<String>,

        pub reset_on_year_change: bool,

        pub notes: Option<String>,

        pub created_at: DateTimeUtc,

        pub created_by: String,

        pub updated_at: DateTimeUtc,

        pub updated_by: String,

        /// Soft delete timestamp
        pub deleted_at: Option<DateTimeUtc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Documents table (lifecycle-relevant columns)
pub mod document {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "documents")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,

        pub tenant_id: Uuid,

        /// DRAFT, OPEN, CLOSED or CANCELLED
        pub status: String,

        pub number: Option<String>,

        pub business_party_id: Option<Uuid>,

        pub document_type_id: Option<Uuid>,

        pub closed_at: Option<DateTimeUtc>,

        /// Optimistic concurrency token
        pub version: i64,

        pub created_at: DateTimeUtc,

        pub created_by: String,

        pub updated_at: DateTimeUtc,

        pub updated_by: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::document_row::Entity")]
        Rows,
        #[sea_orm(has_many = "super::status_history::Entity")]
        StatusHistory,
    }

    impl Related<super::document_row::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Rows.def()
        }
    }

    impl Related<super::status_history::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::StatusHistory.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Document lines table
pub mod document_row {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "document_rows")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,

        pub document_id: Uuid,

        pub position: i32,

        pub description: String,

        pub quantity: Decimal,

        pub unit_price: Decimal,

        /// VAT rate in percent
        pub vat_rate: Decimal,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::document::Entity",
            from = "Column::DocumentId",
            to = "super::document::Column::Id"
        )]
        Document,
    }

    impl Related<super::document::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Document.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Append-only status history table
pub mod status_history {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "document_status_history")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,

        pub document_id: Uuid,

        pub tenant_id: Uuid,

        pub from_status: String,

        pub to_status: String,

        pub reason: Option<String>,

        pub changed_by: String,

        pub changed_at: DateTimeUtc,

        pub client_ip: Option<String>,

        pub user_agent: Option<String>,

        /// Document version reached by the transition
        pub document_version: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::document::Entity",
            from = "Column::DocumentId",
            to = "super::document::Column::Id"
        )]
        Document,
    }

    impl Related<super::document::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Document.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
