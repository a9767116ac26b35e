//! Handwritten Diesel schema declarations used by model structs.
//!
//! Migrations define the actual tables and constraints. This module only
//! provides `diesel::table!` declarations so we can derive Insertable/Queryable
//! in a type-safe way without running `diesel print-schema`.

diesel::table! {
    files (id) {
        id -> BigInt,
        file_name -> Text,
    }
}

// Composite natural key: a reading is identified by its timestamp and device,
// so re-ingesting the same rows conflicts instead of duplicating.
diesel::table! {
    raw_sensor_data (ts, device) {
        ts -> Timestamptz,
        device -> Text,
        temp -> Double,
        humidity -> Nullable<Double>,
        co -> Nullable<Double>,
        lpg -> Nullable<Double>,
        smoke -> Nullable<Double>,
        motion -> Nullable<Bool>,
        light -> Nullable<Bool>,
        file_name -> Text,
        file_id -> BigInt,
        ingested_at -> Timestamptz,
    }
}

diesel::table! {
    aggregated_metrics (file_id, device, sensor_type) {
        file_id -> BigInt,
        device -> Text,
        sensor_type -> Text,
        min_value -> Double,
        max_value -> Double,
        avg_value -> Double,
        std_value -> Nullable<Double>,
        processed_at -> Timestamptz,
    }
}

diesel::joinable!(raw_sensor_data -> files (file_id));
diesel::joinable!(aggregated_metrics -> files (file_id));

diesel::allow_tables_to_appear_in_same_query!(files, raw_sensor_data, aggregated_metrics);
