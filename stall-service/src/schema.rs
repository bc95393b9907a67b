diesel::table! {
    stalls (id) {
        id -> Int8,
        code -> Varchar,
        size -> Varchar,
        location -> Varchar,
        price -> Numeric,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
