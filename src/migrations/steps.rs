//! The built-in step catalogue, from the baseline (version 24) upward.

use rusqlite::{Connection, Transaction};
use tracing::info;

use super::{
    Column, ColumnCopy, Operation, Step, StepContext, TableRebuild, column_exists, ensure_column,
    tolerate_duplicate_column,
};
use crate::db::schema::{
    ARBITRARY_DATA_INTRODUCTION_VERSION, CAPABILITIES, CREATE_UPLOADS, EXTERNAL_LINKS, FILES,
    FILESYSTEM, SHARES, SYNCED_FOLDERS, UPLOADS,
};

const INTEGER: &str = "INTEGER";
const TEXT: &str = "TEXT";

const fn add(table: &'static str, name: &'static str, sql_type: &'static str) -> Operation {
    Operation::AddColumn(Column::new(table, name, sql_type))
}

const fn ensure(table: &'static str, name: &'static str, sql_type: &'static str) -> Operation {
    Operation::EnsureColumn(Column::new(table, name, sql_type))
}

const RESET_CAPABILITIES_ETAG: Operation =
    Operation::Execute("UPDATE capabilities SET etag = '' WHERE 1=1");

const FILE_IS_ENCRYPTED: Column = Column::new(FILES, "is_encrypted", INTEGER);
const FILE_ENCRYPTED_NAME: Column = Column::new(FILES, "encrypted_filename", TEXT);
const END_TO_END_ENCRYPTION: Column = Column::new(CAPABILITIES, "end_to_end_encryption", INTEGER);
const SERVER_TEXT_COLOR: Column = Column::new(CAPABILITIES, "server_text_color", TEXT);
const SERVER_ELEMENT_COLOR: Column = Column::new(CAPABILITIES, "server_element_color", TEXT);
const FILESYSTEM_CRC32: Column = Column::new(FILESYSTEM, "crc32", TEXT);

const UPLOADS_REBUILD: TableRebuild = TableRebuild {
    table: UPLOADS,
    temp_table: "list_of_uploads_old",
    create_sql: CREATE_UPLOADS,
    columns: &[
        ColumnCopy::same("_id"),
        ColumnCopy::same("local_path"),
        ColumnCopy::same("remote_path"),
        ColumnCopy::same("account_name"),
        ColumnCopy::same("file_size"),
        ColumnCopy::same("status"),
        ColumnCopy::same("local_behaviour"),
        ColumnCopy::same("upload_time"),
        ColumnCopy::renamed("force_overwrite", "name_collision_policy"),
        ColumnCopy::same("is_create_remote_folder"),
        ColumnCopy::same("upload_end_timestamp"),
        ColumnCopy::same("last_result"),
        ColumnCopy::same("is_while_charging_only"),
        ColumnCopy::same("is_wifi_only"),
        ColumnCopy::same("created_by"),
        ColumnCopy::same("folder_unlock_token"),
    ],
};

// Some releases shipped 25, 26 and 28 under different version numbers, so a
// database may reach 30 with any subset of their columns.
fn reconcile_encryption_columns(tx: &Transaction, ctx: &StepContext) -> rusqlite::Result<()> {
    ensure_column(tx, &FILE_IS_ENCRYPTED)?;
    ensure_column(tx, &FILE_ENCRYPTED_NAME)?;

    if ctx.from_version <= ARBITRARY_DATA_INTRODUCTION_VERSION {
        return Ok(());
    }

    ensure_column(tx, &END_TO_END_ENCRYPTION)?;
    ensure_column(tx, &SERVER_TEXT_COLOR)?;
    ensure_column(tx, &SERVER_ELEMENT_COLOR)?;

    if !column_exists(tx, FILESYSTEM_CRC32.table, FILESYSTEM_CRC32.name)? {
        add_filesystem_crc32(tx)?;
    }
    Ok(())
}

// Known to collide on some 24 -> 30 upgrades even after the probe.
fn add_filesystem_crc32(conn: &Connection) -> rusqlite::Result<()> {
    info!("adding column '{}' to '{}'", FILESYSTEM_CRC32.name, FILESYSTEM_CRC32.table);
    tolerate_duplicate_column(
        conn.execute(&FILESYSTEM_CRC32.add_sql(), []),
        &FILESYSTEM_CRC32,
    )
}

pub(super) static STEPS: &[Step] = &[
    Step {
        version: 25,
        description: "add encryption flag to files",
        idempotent: false,
        operations: &[
            Operation::AddColumn(FILE_IS_ENCRYPTED),
            Operation::AddColumn(FILE_ENCRYPTED_NAME),
            Operation::AddColumn(END_TO_END_ENCRYPTION),
        ],
    },
    Step {
        version: 26,
        description: "add text and element color to capabilities",
        idempotent: false,
        operations: &[
            Operation::AddColumn(SERVER_TEXT_COLOR),
            Operation::AddColumn(SERVER_ELEMENT_COLOR),
        ],
    },
    Step {
        version: 27,
        description: "add folder unlock token to uploads",
        idempotent: false,
        operations: &[add(UPLOADS, "folder_unlock_token", TEXT)],
    },
    Step {
        version: 28,
        description: "add crc32 to filesystem",
        idempotent: true,
        operations: &[Operation::EnsureColumn(FILESYSTEM_CRC32)],
    },
    Step {
        version: 29,
        description: "add background default/plain to capabilities",
        idempotent: false,
        operations: &[
            add(CAPABILITIES, "background_default", INTEGER),
            add(CAPABILITIES, "background_plain", INTEGER),
        ],
    },
    Step {
        version: 30,
        description: "re-add encryption and theming columns if missing",
        idempotent: true,
        operations: &[Operation::Custom(reconcile_encryption_columns)],
    },
    Step {
        version: 31,
        description: "add mount type to files",
        idempotent: false,
        operations: &[add(FILES, "mount_type", INTEGER)],
    },
    Step {
        version: 32,
        description: "add password protection flag to shares",
        idempotent: false,
        operations: &[add(SHARES, "is_password_protected", INTEGER)],
    },
    Step {
        version: 33,
        description: "add activity to capabilities",
        idempotent: false,
        operations: &[add(CAPABILITIES, "activity", INTEGER)],
    },
    Step {
        version: 34,
        description: "add redirect to external links",
        idempotent: true,
        operations: &[ensure(EXTERNAL_LINKS, "redirect", INTEGER)],
    },
    Step {
        version: 35,
        description: "add note to shares",
        idempotent: false,
        operations: &[add(SHARES, "note", TEXT)],
    },
    Step {
        version: 36,
        description: "add has-preview to files",
        idempotent: false,
        operations: &[add(FILES, "has_preview", INTEGER)],
    },
    Step {
        version: 37,
        description: "add hide-download to shares",
        idempotent: false,
        operations: &[add(SHARES, "hide_download", INTEGER)],
    },
    Step {
        version: 38,
        description: "add rich documents to capabilities",
        idempotent: false,
        operations: &[
            add(CAPABILITIES, "richdocument", INTEGER),
            add(CAPABILITIES, "richdocument_mimetype_list", TEXT),
        ],
    },
    Step {
        version: 39,
        description: "add rich documents direct editing to capabilities",
        idempotent: false,
        operations: &[add(CAPABILITIES, "richdocument_direct_editing", INTEGER)],
    },
    Step {
        version: 40,
        description: "add unread comments count to files",
        idempotent: false,
        operations: &[add(FILES, "unread_comments_count", INTEGER)],
    },
    Step {
        version: 41,
        description: "add server etag to files",
        idempotent: false,
        operations: &[add(FILES, "etag_on_server", TEXT)],
    },
    Step {
        version: 42,
        description: "add rich documents templates to capabilities",
        idempotent: false,
        operations: &[add(CAPABILITIES, "richdocument_templates", INTEGER)],
    },
    Step {
        version: 43,
        description: "add owner id and display name to files",
        idempotent: false,
        operations: &[
            add(FILES, "owner_id", TEXT),
            add(FILES, "owner_display_name", TEXT),
        ],
    },
    Step {
        version: 44,
        description: "add note to files",
        idempotent: false,
        operations: &[add(FILES, "note", TEXT)],
    },
    Step {
        version: 45,
        description: "add sharees to files",
        idempotent: false,
        operations: &[add(FILES, "sharees", TEXT)],
    },
    Step {
        version: 46,
        description: "add optional mimetypes to capabilities",
        idempotent: false,
        operations: &[add(CAPABILITIES, "richdocument_optional_mimetype_list", TEXT)],
    },
    Step {
        version: 47,
        description: "add ask for optional password to capabilities",
        idempotent: false,
        operations: &[add(CAPABILITIES, "sharing_public_ask_for_optional_password", INTEGER)],
    },
    Step {
        version: 48,
        description: "add product name to capabilities",
        idempotent: false,
        operations: &[add(CAPABILITIES, "richdocument_product_name", TEXT)],
    },
    Step {
        version: 49,
        description: "add extended support to capabilities",
        idempotent: false,
        operations: &[add(CAPABILITIES, "extended_support", INTEGER)],
    },
    Step {
        version: 50,
        description: "add persistent enable date to synced folders",
        idempotent: false,
        operations: &[
            add(SYNCED_FOLDERS, "enabled_timestamp_ms", INTEGER),
            // -1 marks a folder that was never enabled.
            Operation::ExecuteAt(
                "UPDATE synced_folders SET enabled_timestamp_ms = \
                 CASE WHEN enabled = 0 THEN -1 ELSE :now END",
            ),
        ],
    },
    Step {
        version: 51,
        description: "add hidden flag to synced folders",
        idempotent: false,
        operations: &[add(SYNCED_FOLDERS, "hidden", INTEGER)],
    },
    Step {
        version: 52,
        description: "add direct editing etag to capabilities",
        idempotent: false,
        operations: &[add(CAPABILITIES, "direct_editing_etag", TEXT)],
    },
    Step {
        version: 53,
        description: "add rich workspace to files",
        idempotent: true,
        operations: &[ensure(FILES, "rich_workspace", TEXT)],
    },
    Step {
        version: 54,
        description: "add existing flag to synced folders, rename uploads force_overwrite to name_collision_policy",
        idempotent: false,
        operations: &[
            add(SYNCED_FOLDERS, "existing", INTEGER),
            Operation::Rebuild(UPLOADS_REBUILD),
        ],
    },
    Step {
        version: 55,
        description: "add name collision policy to synced folders",
        idempotent: false,
        operations: &[
            add(SYNCED_FOLDERS, "name_collision_policy", INTEGER),
            // 0 is "ask the user".
            Operation::Execute("UPDATE synced_folders SET name_collision_policy = 0"),
        ],
    },
    Step {
        version: 56,
        description: "add decrypted remote path to files",
        idempotent: false,
        operations: &[add(FILES, "path_decrypted", TEXT)],
    },
    Step {
        version: 57,
        description: "add etag to capabilities",
        idempotent: false,
        operations: &[add(CAPABILITIES, "etag", TEXT)],
    },
    Step {
        version: 58,
        description: "add public link to shares",
        idempotent: false,
        operations: &[add(SHARES, "share_link", TEXT)],
    },
    Step {
        version: 59,
        description: "add public label to shares",
        idempotent: false,
        operations: &[add(SHARES, "share_label", TEXT)],
    },
    Step {
        version: 60,
        description: "add user status to capabilities",
        idempotent: false,
        operations: &[
            add(CAPABILITIES, "user_status", INTEGER),
            add(CAPABILITIES, "user_status_supports_emoji", INTEGER),
        ],
    },
    Step {
        version: 61,
        description: "reset capabilities etag to force a refresh",
        idempotent: true,
        operations: &[RESET_CAPABILITIES_ETAG],
    },
    Step {
        version: 62,
        description: "add logo to capabilities",
        idempotent: false,
        operations: &[
            add(CAPABILITIES, "server_logo", TEXT),
            RESET_CAPABILITIES_ETAG,
        ],
    },
    Step {
        version: 63,
        description: "add file locking columns",
        idempotent: false,
        operations: &[
            add(CAPABILITIES, "files_locking_version", TEXT),
            RESET_CAPABILITIES_ETAG,
            add(FILES, "locked", INTEGER),
            add(FILES, "lock_type", INTEGER),
            add(FILES, "lock_owner", TEXT),
            add(FILES, "lock_owner_display_name", TEXT),
            add(FILES, "lock_owner_editor", TEXT),
            add(FILES, "lock_timestamp", INTEGER),
            add(FILES, "lock_timeout", INTEGER),
            add(FILES, "lock_token", TEXT),
            Operation::Execute("UPDATE filelist SET etag = '' WHERE 1=1"),
        ],
    },
    Step {
        version: 64,
        description: "add metadata size to files",
        idempotent: false,
        operations: &[add(FILES, "metadata_size", TEXT)],
    },
];
