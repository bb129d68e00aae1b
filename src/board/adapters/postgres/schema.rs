//! Diesel schema for board item persistence.

diesel::table! {
    /// Board items and sub-items.
    board_items (id) {
        /// Item identifier.
        id -> Uuid,
        /// Item title.
        #[max_length = 255]
        title -> Varchar,
        /// Optional free-form description.
        description -> Nullable<Text>,
        /// Sanitized tag list as a JSON array of strings.
        tags -> Jsonb,
        /// Optional due date.
        due_date -> Nullable<Date>,
        /// Lane of a top-level item; null for sub-items.
        #[max_length = 100]
        lane -> Nullable<Varchar>,
        /// Owning item of a sub-item; null for top-level items.
        parent_id -> Nullable<Uuid>,
        /// Position within the (parent, lane) partition.
        order_key -> BigInt,
        /// Archive flag.
        archived -> Bool,
        /// Sub-item completion flag.
        completed -> Bool,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
