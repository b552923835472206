//! Table names and the baseline schema that migrations start from.

use crate::migrations::SchemaVersion;

pub const FILES: &str = "filelist";
pub const CAPABILITIES: &str = "capabilities";
pub const UPLOADS: &str = "list_of_uploads";
pub const SHARES: &str = "ocshares";
pub const SYNCED_FOLDERS: &str = "synced_folders";
pub const EXTERNAL_LINKS: &str = "external_links";
pub const FILESYSTEM: &str = "filesystem";
pub const ARBITRARY_DATA: &str = "arbitrary_data";
pub const VIRTUAL: &str = "virtual";

/// Oldest schema this crate knows how to upgrade.
pub const BASELINE_VERSION: SchemaVersion = 24;

/// Version that introduced the `arbitrary_data` table.
pub const ARBITRARY_DATA_INTRODUCTION_VERSION: SchemaVersion = 20;

/// Tables as they stood at [`BASELINE_VERSION`].
pub const BASELINE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS filelist (
    _id INTEGER PRIMARY KEY,
    filename TEXT,
    path TEXT,
    parent INTEGER,
    created INTEGER,
    modified INTEGER,
    content_type TEXT,
    content_length INTEGER,
    media_path TEXT,
    file_owner TEXT,
    last_sync_date INTEGER,
    last_sync_date_for_data INTEGER,
    modified_at_last_sync_for_data INTEGER,
    etag TEXT,
    share_by_link INTEGER,
    permissions TEXT,
    remote_id TEXT,
    update_thumbnail INTEGER,
    is_downloading INTEGER,
    favorite INTEGER,
    etag_in_conflict TEXT,
    shared_via_users INTEGER
);

CREATE TABLE IF NOT EXISTS capabilities (
    _id INTEGER PRIMARY KEY,
    account TEXT,
    version_mayor INTEGER,
    version_minor INTEGER,
    version_micro INTEGER,
    version_string TEXT,
    version_edition TEXT,
    core_pollinterval INTEGER,
    sharing_api_enabled INTEGER,
    sharing_public_enabled INTEGER,
    sharing_public_password_enforced INTEGER,
    sharing_public_expire_date_enabled INTEGER,
    sharing_public_expire_date_days INTEGER,
    sharing_public_expire_date_enforced INTEGER,
    sharing_public_send_mail INTEGER,
    sharing_public_upload INTEGER,
    sharing_user_send_mail INTEGER,
    sharing_resharing INTEGER,
    sharing_federation_outgoing INTEGER,
    sharing_federation_incoming INTEGER,
    files_bigfilechunking INTEGER,
    files_undelete INTEGER,
    files_versioning INTEGER,
    external_links INTEGER,
    server_name TEXT,
    server_color TEXT,
    server_background_url TEXT,
    server_slogan TEXT
);

CREATE TABLE IF NOT EXISTS list_of_uploads (
    _id INTEGER PRIMARY KEY,
    local_path TEXT,
    remote_path TEXT,
    account_name TEXT,
    file_size LONG,
    status INTEGER,
    local_behaviour INTEGER,
    upload_time INTEGER,
    force_overwrite INTEGER,
    is_create_remote_folder INTEGER,
    upload_end_timestamp INTEGER,
    last_result INTEGER,
    is_while_charging_only INTEGER,
    is_wifi_only INTEGER,
    created_by INTEGER
);

CREATE TABLE IF NOT EXISTS ocshares (
    _id INTEGER PRIMARY KEY,
    file_source INTEGER,
    item_source INTEGER,
    share_type INTEGER,
    shate_with TEXT,
    path TEXT,
    permissions INTEGER,
    shared_date INTEGER,
    expiration_date INTEGER,
    token TEXT,
    shared_with_display_name TEXT,
    is_directory INTEGER,
    user_id INTEGER,
    id_remote_shared INTEGER,
    owner_share TEXT
);

CREATE TABLE IF NOT EXISTS synced_folders (
    _id INTEGER PRIMARY KEY,
    local_path TEXT,
    remote_path TEXT,
    wifi_only INTEGER,
    charging_only INTEGER,
    enabled INTEGER,
    subfolder_by_date INTEGER,
    account TEXT,
    upload_option INTEGER,
    type INTEGER
);

CREATE TABLE IF NOT EXISTS external_links (
    _id INTEGER PRIMARY KEY,
    icon_url TEXT,
    language TEXT,
    type INTEGER,
    name TEXT,
    url TEXT
);

CREATE TABLE IF NOT EXISTS filesystem (
    _id INTEGER PRIMARY KEY,
    local_path TEXT,
    is_folder INTEGER,
    found_at LONG,
    upload_triggered INTEGER,
    syncedfolder_id STRING,
    modified_at LONG
);

CREATE TABLE IF NOT EXISTS arbitrary_data (
    _id INTEGER PRIMARY KEY,
    cloud_id TEXT,
    'key' TEXT,
    value TEXT
);

CREATE TABLE IF NOT EXISTS 'virtual' (
    _id INTEGER PRIMARY KEY,
    type TEXT,
    ocfile_id INTEGER
);
"#;

/// `list_of_uploads` once `force_overwrite` became `name_collision_policy`.
pub const CREATE_UPLOADS: &str = "CREATE TABLE list_of_uploads (
    _id INTEGER PRIMARY KEY,
    local_path TEXT,
    remote_path TEXT,
    account_name TEXT,
    file_size LONG,
    status INTEGER,
    local_behaviour INTEGER,
    upload_time INTEGER,
    name_collision_policy INTEGER,
    is_create_remote_folder INTEGER,
    upload_end_timestamp INTEGER,
    last_result INTEGER,
    is_while_charging_only INTEGER,
    is_wifi_only INTEGER,
    created_by INTEGER,
    folder_unlock_token TEXT
)";

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;
    use crate::migrations::{column_exists, table_columns};

    #[test]
    fn baseline_creates_every_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(BASELINE_SCHEMA).unwrap();

        for table in [
            FILES,
            CAPABILITIES,
            UPLOADS,
            SHARES,
            SYNCED_FOLDERS,
            EXTERNAL_LINKS,
            FILESYSTEM,
            ARBITRARY_DATA,
            VIRTUAL,
        ] {
            assert!(!table_columns(&conn, table).unwrap().is_empty(), "{table}");
        }
        assert!(column_exists(&conn, UPLOADS, "force_overwrite").unwrap());
        assert!(!column_exists(&conn, FILESYSTEM, "crc32").unwrap());
    }
}
