//! MySQL Protocol Constants
//!
//! The read-only dictionary consumed at the wire boundary. Values come
//! from `include/mysql/mysql_com.h`, `errmsg.h`, `mysqld_error.h` and
//! `sql_state.h`; see
//! <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basics.html>.

/// Maximum payload length of a single packet.
pub const MAX_PACKET_SIZE: usize = (1 << 24) - 1;

/// Protocol version. Always 10.
pub const PROTOCOL_VERSION: u8 = 10;

/// Authentication methods supported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethodDescription {
    /// Salted double-SHA1 hash on the wire.
    MysqlNativePassword,
    /// Password in the clear.
    MysqlClearPassword,
    /// Salted SHA256 hash on the wire.
    CachingSha2Password,
    /// Dialog plugin on the client side; data in the clear.
    MysqlDialog,
}

impl AuthMethodDescription {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethodDescription::MysqlNativePassword => "mysql_native_password",
            AuthMethodDescription::MysqlClearPassword => "mysql_clear_password",
            AuthMethodDescription::CachingSha2Password => "caching_sha2_password",
            AuthMethodDescription::MysqlDialog => "dialog",
        }
    }
}

// Capability flags.

/// CLIENT_LONG_PASSWORD. Assumed to be set since 4.1.1, never checked.
pub const CAPABILITY_CLIENT_LONG_PASSWORD: u32 = 1;
/// CLIENT_FOUND_ROWS.
pub const CAPABILITY_CLIENT_FOUND_ROWS: u32 = 1 << 1;
/// CLIENT_LONG_FLAG. Set everywhere, unused with ColumnDefinition41.
pub const CAPABILITY_CLIENT_LONG_FLAG: u32 = 1 << 2;
/// CLIENT_CONNECT_WITH_DB. One can specify db on connect.
pub const CAPABILITY_CLIENT_CONNECT_WITH_DB: u32 = 1 << 3;
/// CLIENT_PROTOCOL_41. Enforced everywhere.
pub const CAPABILITY_CLIENT_PROTOCOL_41: u32 = 1 << 9;
/// CLIENT_SSL. Switch to SSL after handshake.
pub const CAPABILITY_CLIENT_SSL: u32 = 1 << 11;
/// CLIENT_TRANSACTIONS. Can send status flags in EOF_Packet.
pub const CAPABILITY_CLIENT_TRANSACTIONS: u32 = 1 << 13;
/// CLIENT_SECURE_CONNECTION. Always set, expected, never checked.
pub const CAPABILITY_CLIENT_SECURE_CONNECTION: u32 = 1 << 15;
/// CLIENT_MULTI_STATEMENTS. Multiple statements per COM_QUERY.
pub const CAPABILITY_CLIENT_MULTI_STATEMENTS: u32 = 1 << 16;
/// CLIENT_MULTI_RESULTS. Multiple resultsets for COM_QUERY.
pub const CAPABILITY_CLIENT_MULTI_RESULTS: u32 = 1 << 17;
/// CLIENT_PLUGIN_AUTH. Client supports plugin authentication.
pub const CAPABILITY_CLIENT_PLUGIN_AUTH: u32 = 1 << 19;
/// CLIENT_CONNECT_ATTRS. Connection attributes in HandshakeResponse41.
pub const CAPABILITY_CLIENT_CONN_ATTR: u32 = 1 << 20;
/// CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA.
pub const CAPABILITY_CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA: u32 = 1 << 21;
/// CLIENT_SESSION_TRACK. Session-state change data after OK packets.
pub const CAPABILITY_CLIENT_SESSION_TRACK: u32 = 1 << 23;
/// CLIENT_DEPRECATE_EOF. OK instead of EOF after text resultset rows.
pub const CAPABILITY_CLIENT_DEPRECATE_EOF: u32 = 1 << 24;

// Status flags, returned by the server in a few cases.

/// A transaction is active.
pub const SERVER_STATUS_IN_TRANS: u16 = 0x0001;
pub const NO_SERVER_STATUS_IN_TRANS: u16 = 0xFFFE;
/// Auto-commit is enabled.
pub const SERVER_STATUS_AUTOCOMMIT: u16 = 0x0002;
pub const NO_SERVER_STATUS_AUTOCOMMIT: u16 = 0xFFFD;
pub const SERVER_MORE_RESULTS_EXISTS: u16 = 0x0008;
pub const SERVER_STATUS_NO_GOOD_INDEX_USED: u16 = 0x0010;
pub const SERVER_STATUS_NO_INDEX_USED: u16 = 0x0020;
/// COM_STMT_FETCH must be used to fetch the row data.
pub const SERVER_STATUS_CURSOR_EXISTS: u16 = 0x0040;
pub const SERVER_STATUS_LAST_ROW_SENT: u16 = 0x0080;
pub const SERVER_STATUS_DB_DROPPED: u16 = 0x0100;
pub const SERVER_STATUS_NO_BACKSLASH_ESCAPES: u16 = 0x0200;
pub const SERVER_STATUS_METADATA_CHANGED: u16 = 0x0400;
pub const SERVER_QUERY_WAS_SLOW: u16 = 0x0800;
pub const SERVER_PS_OUT_PARAMS: u16 = 0x1000;
/// In a read-only transaction.
pub const SERVER_STATUS_IN_TRANS_READONLY: u16 = 0x2000;
/// Connection state information has changed.
pub const SERVER_SESSION_STATE_CHANGED: u16 = 0x4000;

// Session-track state change kinds.

/// One or more system variables changed.
pub const SESSION_TRACK_SYSTEM_VARIABLES: u8 = 0x00;
/// Schema changed.
pub const SESSION_TRACK_SCHEMA: u8 = 0x01;
/// "Track state change" changed.
pub const SESSION_TRACK_STATE_CHANGE: u8 = 0x02;
/// "Track GTIDs" changed.
pub const SESSION_TRACK_GTIDS: u8 = 0x03;

// Packet types.

pub const COM_QUIT: u8 = 0x01;
pub const COM_INIT_DB: u8 = 0x02;
pub const COM_QUERY: u8 = 0x03;
pub const COM_FIELD_LIST: u8 = 0x04;
pub const COM_PING: u8 = 0x0e;
pub const COM_BINLOG_DUMP: u8 = 0x12;
pub const COM_PREPARE: u8 = 0x16;
pub const COM_STMT_EXECUTE: u8 = 0x17;
pub const COM_STMT_SEND_LONG_DATA: u8 = 0x18;
pub const COM_STMT_CLOSE: u8 = 0x19;
pub const COM_STMT_RESET: u8 = 0x1a;
pub const COM_SET_OPTION: u8 = 0x1b;
pub const COM_STMT_FETCH: u8 = 0x1c;
pub const COM_BINLOG_DUMP_GTID: u8 = 0x1e;
pub const COM_RESET_CONNECTION: u8 = 0x1f;
pub const COM_SEMI_SYNC_ACK: u8 = 0xef;

/// Header of the OK packet.
pub const OK_PACKET: u8 = 0x00;
/// Header of the EOF packet.
pub const EOF_PACKET: u8 = 0xfe;
/// Header of the error packet.
pub const ERR_PACKET: u8 = 0xff;
/// Encoded value of NULL.
pub const NULL_VALUE: u8 = 0xfb;

// Auth packet types.

/// Sent when the server requires more data to authenticate.
pub const AUTH_MORE_DATA_PACKET: u8 = 0x01;
/// Sent before an OK packet when the server authenticates from cache.
pub const CACHING_SHA2_FAST_AUTH: u8 = 0x03;
/// Sent when the server requests the un-scrambled password.
pub const CACHING_SHA2_FULL_AUTH: u8 = 0x04;
/// Used to switch the auth method.
pub const AUTH_SWITCH_REQUEST_PACKET: u8 = 0xfe;

// Error codes for client-side errors, from errmsg.h.

/// CR_UNKNOWN_ERROR.
pub const CR_UNKNOWN_ERROR: u16 = 2000;
/// CR_CONNECTION_ERROR: a connection via a Unix socket failed.
pub const CR_CONNECTION_ERROR: u16 = 2002;
/// CR_CONN_HOST_ERROR: a connection via a TCP socket failed.
pub const CR_CONN_HOST_ERROR: u16 = 2003;
/// CR_SERVER_GONE_ERROR: sending a command failed.
pub const CR_SERVER_GONE: u16 = 2006;
/// CR_VERSION_ERROR: server version mismatch.
pub const CR_VERSION_ERROR: u16 = 2007;
/// CR_SERVER_HANDSHAKE_ERR.
pub const CR_SERVER_HANDSHAKE_ERR: u16 = 2012;
/// CR_SERVER_LOST: cannot read or write the auth packet, or cannot read
/// a response. Happens when a running query is killed.
pub const CR_SERVER_LOST: u16 = 2013;
/// CR_COMMANDS_OUT_OF_SYNC: streaming calls in the wrong order.
pub const CR_COMMANDS_OUT_OF_SYNC: u16 = 2014;
/// CR_NAMEDPIPESETSTATE_ERROR: highest possible connection error number.
pub const CR_NAMED_PIPE_STATE_ERROR: u16 = 2018;
/// CR_CANT_READ_CHARSET.
pub const CR_CANT_READ_CHARSET: u16 = 2019;
/// CR_SSL_CONNECTION_ERROR.
pub const CR_SSL_CONNECTION_ERROR: u16 = 2026;
/// CR_MALFORMED_PACKET.
pub const CR_MALFORMED_PACKET: u16 = 2027;

// Error codes for server-side errors, from mysqld_error.h. Sorted by
// value, grouped by the class they are bucketed into.

// proxy-specific
pub const ER_NOT_REPLICA: u16 = 100;

// unknown
pub const ER_UNKNOWN_ERROR: u16 = 1105;

// internal
pub const ER_INTERNAL_ERROR: u16 = 1815;

// unimplemented
pub const ER_NOT_SUPPORTED_YET: u16 = 1235;
pub const ER_UNSUPPORTED_PS: u16 = 1295;

// resource exhausted
pub const ER_DISK_FULL: u16 = 1021;
pub const ER_OUT_OF_MEMORY: u16 = 1037;
pub const ER_OUT_OF_SORT_MEMORY: u16 = 1038;
pub const ER_CON_COUNT: u16 = 1040;
pub const ER_OUT_OF_RESOURCES: u16 = 1041;
pub const ER_RECORD_FILE_FULL: u16 = 1114;
pub const ER_HOST_IS_BLOCKED: u16 = 1129;
pub const ER_CANT_CREATE_THREAD: u16 = 1135;
pub const ER_TOO_MANY_DELAYED_THREADS: u16 = 1151;
pub const ER_NET_PACKET_TOO_LARGE: u16 = 1153;
pub const ER_TOO_MANY_USER_CONNECTIONS: u16 = 1203;
pub const ER_LOCK_TABLE_FULL: u16 = 1206;
pub const ER_USER_LIMIT_REACHED: u16 = 1226;

// deadline exceeded
pub const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;

// unavailable
pub const ER_SERVER_SHUTDOWN: u16 = 1053;

// not found
pub const ER_CANT_FIND_FILE: u16 = 1017;
pub const ER_FORM_NOT_FOUND: u16 = 1029;
pub const ER_KEY_NOT_FOUND: u16 = 1032;
pub const ER_BAD_FIELD_ERROR: u16 = 1054;
pub const ER_NO_SUCH_THREAD: u16 = 1094;
pub const ER_UNKNOWN_TABLE: u16 = 1109;
pub const ER_CANT_FIND_UDF: u16 = 1122;
pub const ER_NON_EXISTING_GRANT: u16 = 1141;
pub const ER_NO_SUCH_TABLE: u16 = 1146;
pub const ER_NON_EXISTING_TABLE_GRANT: u16 = 1147;
pub const ER_KEY_DOES_NOT_EXIST: u16 = 1176;
pub const ER_DB_DROP_EXISTS: u16 = 1008;

// permissions
pub const ER_DB_ACCESS_DENIED: u16 = 1044;
pub const ER_ACCESS_DENIED_ERROR: u16 = 1045;
pub const ER_KILL_DENIED: u16 = 1095;
pub const ER_NO_PERMISSION_TO_CREATE_USERS: u16 = 1211;
pub const ER_SPECIFIED_ACCESS_DENIED: u16 = 1227;

// failed precondition
pub const ER_NO_DB: u16 = 1046;
pub const ER_NO_SUCH_INDEX: u16 = 1082;
pub const ER_CANT_DROP_FIELD_OR_KEY: u16 = 1091;
pub const ER_TABLE_NOT_LOCKED_FOR_WRITE: u16 = 1099;
pub const ER_TABLE_NOT_LOCKED: u16 = 1100;
pub const ER_TOO_BIG_SELECT: u16 = 1104;
pub const ER_NOT_ALLOWED_COMMAND: u16 = 1148;
pub const ER_TOO_LONG_STRING: u16 = 1162;
pub const ER_DELAYED_INSERT_TABLE_LOCKED: u16 = 1165;
pub const ER_DUP_UNIQUE: u16 = 1169;
pub const ER_REQUIRES_PRIMARY_KEY: u16 = 1173;
pub const ER_CANT_DO_THIS_DURING_AN_TRANSACTION: u16 = 1179;
pub const ER_READ_ONLY_TRANSACTION: u16 = 1207;
pub const ER_CANNOT_ADD_FOREIGN: u16 = 1215;
pub const ER_NO_REFERENCED_ROW: u16 = 1216;
pub const ER_ROW_IS_REFERENCED: u16 = 1217;
pub const ER_CANT_UPDATE_WITH_READ_LOCK: u16 = 1223;
pub const ER_NO_DEFAULT: u16 = 1230;
pub const ER_MASTER_FATAL_READING_BINLOG: u16 = 1236;
pub const ER_OPERAND_COLUMNS: u16 = 1241;
pub const ER_SUBQUERY_NO_1_ROW: u16 = 1242;
pub const ER_WARN_DATA_OUT_OF_RANGE: u16 = 1264;
pub const ER_NON_UPDATEABLE_TABLE: u16 = 1288;
pub const ER_FEATURE_DISABLED: u16 = 1289;
pub const ER_OPTION_PREVENTS_STATEMENT: u16 = 1290;
pub const ER_DUPLICATED_VALUE_IN_TYPE: u16 = 1291;
pub const ER_SP_DOES_NOT_EXIST: u16 = 1305;
pub const ER_NO_DEFAULT_FOR_FIELD: u16 = 1364;
pub const ER_SP_NOT_VAR_ARG: u16 = 1414;
pub const ER_ROW_IS_REFERENCED_2: u16 = 1451;
pub const ER_NO_REFERENCED_ROW_2: u16 = 1452;
pub const ER_INNODB_READ_ONLY: u16 = 1874;

// already exists
pub const ER_DB_CREATE_EXISTS: u16 = 1007;
pub const ER_TABLE_EXISTS: u16 = 1050;
pub const ER_DUP_ENTRY: u16 = 1062;
pub const ER_FILE_EXISTS: u16 = 1086;
pub const ER_UDF_EXISTS: u16 = 1125;

// aborted
pub const ER_GOT_SIGNAL: u16 = 1078;
pub const ER_FORCING_CLOSE: u16 = 1080;
pub const ER_ABORTING_CONNECTION: u16 = 1152;
pub const ER_LOCK_DEADLOCK: u16 = 1213;

// invalid arg
pub const ER_UNKNOWN_COM_ERROR: u16 = 1047;
pub const ER_BAD_NULL_ERROR: u16 = 1048;
pub const ER_BAD_DB: u16 = 1049;
pub const ER_BAD_TABLE: u16 = 1051;
pub const ER_NON_UNIQ: u16 = 1052;
pub const ER_WRONG_FIELD_WITH_GROUP: u16 = 1055;
pub const ER_WRONG_GROUP_FIELD: u16 = 1056;
pub const ER_WRONG_SUM_SELECT: u16 = 1057;
pub const ER_WRONG_VALUE_COUNT: u16 = 1058;
pub const ER_TOO_LONG_IDENT: u16 = 1059;
pub const ER_DUP_FIELD_NAME: u16 = 1060;
pub const ER_DUP_KEY_NAME: u16 = 1061;
pub const ER_WRONG_FIELD_SPEC: u16 = 1063;
pub const ER_PARSE_ERROR: u16 = 1064;
pub const ER_EMPTY_QUERY: u16 = 1065;
pub const ER_NON_UNIQ_TABLE: u16 = 1066;
pub const ER_INVALID_DEFAULT: u16 = 1067;
pub const ER_MULTIPLE_PRI_KEY: u16 = 1068;
pub const ER_TOO_MANY_KEYS: u16 = 1069;
pub const ER_TOO_MANY_KEY_PARTS: u16 = 1070;
pub const ER_TOO_LONG_KEY: u16 = 1071;
pub const ER_KEY_COLUMN_DOES_NOT_EXIST: u16 = 1072;
pub const ER_BLOB_USED_AS_KEY: u16 = 1073;
pub const ER_TOO_BIG_FIELD_LENGTH: u16 = 1074;
pub const ER_WRONG_AUTO_KEY: u16 = 1075;
pub const ER_WRONG_FIELD_TERMINATORS: u16 = 1083;
pub const ER_BLOBS_AND_NO_TERMINATED: u16 = 1084;
pub const ER_TEXT_FILE_NOT_READABLE: u16 = 1085;
pub const ER_WRONG_SUB_KEY: u16 = 1089;
pub const ER_CANT_REMOVE_ALL_FIELDS: u16 = 1090;
pub const ER_UPDATE_TABLE_USED: u16 = 1093;
pub const ER_NO_TABLES_USED: u16 = 1096;
pub const ER_TOO_BIG_SET: u16 = 1097;
pub const ER_BLOB_CANT_HAVE_DEFAULT: u16 = 1101;
pub const ER_WRONG_DB_NAME: u16 = 1102;
pub const ER_WRONG_TABLE_NAME: u16 = 1103;
pub const ER_UNKNOWN_PROCEDURE: u16 = 1106;
pub const ER_WRONG_PARAM_COUNT_TO_PROCEDURE: u16 = 1107;
pub const ER_WRONG_PARAMETERS_TO_PROCEDURE: u16 = 1108;
pub const ER_FIELD_SPECIFIED_TWICE: u16 = 1110;
pub const ER_INVALID_GROUP_FUNC_USE: u16 = 1111;
pub const ER_TABLE_MUST_HAVE_COLUMNS: u16 = 1113;
pub const ER_UNKNOWN_CHARACTER_SET: u16 = 1115;
pub const ER_TOO_MANY_TABLES: u16 = 1116;
pub const ER_TOO_MANY_FIELDS: u16 = 1117;
pub const ER_TOO_BIG_ROW_SIZE: u16 = 1118;
pub const ER_WRONG_OUTER_JOIN: u16 = 1120;
pub const ER_NULL_COLUMN_IN_INDEX: u16 = 1121;
pub const ER_FUNCTION_NOT_DEFINED: u16 = 1128;
pub const ER_WRONG_VALUE_COUNT_ON_ROW: u16 = 1136;
pub const ER_INVALID_USE_OF_NULL: u16 = 1138;
pub const ER_REGEXP_ERROR: u16 = 1139;
pub const ER_MIX_OF_GROUP_FUNC_AND_FIELDS: u16 = 1140;
pub const ER_ILLEGAL_GRANT_FOR_TABLE: u16 = 1144;
pub const ER_SYNTAX_ERROR: u16 = 1149;
pub const ER_WRONG_COLUMN_NAME: u16 = 1166;
pub const ER_WRONG_KEY_COLUMN: u16 = 1167;
pub const ER_BLOB_KEY_WITHOUT_LENGTH: u16 = 1170;
pub const ER_PRIMARY_CANT_HAVE_NULL: u16 = 1171;
pub const ER_TOO_MANY_ROWS: u16 = 1172;
pub const ER_LOCK_OR_ACTIVE_TRANSACTION: u16 = 1192;
pub const ER_UNKNOWN_SYSTEM_VARIABLE: u16 = 1193;
pub const ER_SET_CONSTANTS_ONLY: u16 = 1204;
pub const ER_WRONG_ARGUMENTS: u16 = 1210;
pub const ER_WRONG_USAGE: u16 = 1221;
pub const ER_WRONG_NUMBER_OF_COLUMNS_IN_SELECT: u16 = 1222;
pub const ER_DUP_ARGUMENT: u16 = 1225;
pub const ER_LOCAL_VARIABLE: u16 = 1228;
pub const ER_GLOBAL_VARIABLE: u16 = 1229;
pub const ER_WRONG_VALUE_FOR_VAR: u16 = 1231;
pub const ER_WRONG_TYPE_FOR_VAR: u16 = 1232;
pub const ER_VAR_CANT_BE_READ: u16 = 1233;
pub const ER_CANT_USE_OPTION_HERE: u16 = 1234;
pub const ER_INCORRECT_GLOBAL_LOCAL_VAR: u16 = 1238;
pub const ER_WRONG_FK_DEF: u16 = 1239;
pub const ER_KEY_REF_DO_NOT_MATCH_TABLE_REF: u16 = 1240;
pub const ER_CYCLIC_REFERENCE: u16 = 1245;
pub const ER_ILLEGAL_REFERENCE: u16 = 1247;
pub const ER_DERIVED_MUST_HAVE_ALIAS: u16 = 1248;
pub const ER_TABLE_NAME_NOT_ALLOWED_HERE: u16 = 1250;
pub const ER_COLLATION_CHARSET_MISMATCH: u16 = 1253;
pub const ER_WARN_DATA_TRUNCATED: u16 = 1265;
pub const ER_CANT_AGGREGATE_2_COLLATIONS: u16 = 1267;
pub const ER_CANT_AGGREGATE_3_COLLATIONS: u16 = 1270;
pub const ER_CANT_AGGREGATE_N_COLLATIONS: u16 = 1271;
pub const ER_VARIABLE_IS_NOT_STRUCT: u16 = 1272;
pub const ER_UNKNOWN_COLLATION: u16 = 1273;
pub const ER_WRONG_NAME_FOR_INDEX: u16 = 1280;
pub const ER_WRONG_NAME_FOR_CATALOG: u16 = 1281;
pub const ER_BAD_FT_COLUMN: u16 = 1283;
pub const ER_TRUNCATED_WRONG_VALUE: u16 = 1292;
pub const ER_TOO_MUCH_AUTO_TIMESTAMP_COLS: u16 = 1293;
pub const ER_INVALID_ON_UPDATE: u16 = 1294;
pub const ER_UNKNOWN_TIME_ZONE: u16 = 1298;
pub const ER_INVALID_CHARACTER_STRING: u16 = 1300;
pub const ER_QUERY_INTERRUPTED: u16 = 1317;
pub const ER_TRUNCATED_WRONG_VALUE_FOR_FIELD: u16 = 1366;
pub const ER_ILLEGAL_VALUE_FOR_TYPE: u16 = 1367;
pub const ER_DATA_TOO_LONG: u16 = 1406;
pub const ER_WRONG_VALUE_FOR_TYPE: u16 = 1411;
pub const ER_CANT_CREATE_GEOMETRY_OBJECT: u16 = 1416;
pub const ER_FORBID_SCHEMA_CHANGE: u16 = 1450;
pub const ER_DATA_OUT_OF_RANGE: u16 = 1690;
pub const ER_GIS_DATA_WRONG_ENDIANESS: u16 = 3055;
pub const ER_INVALID_JSON_TEXT: u16 = 3140;
pub const ER_INVALID_JSON_TEXT_IN_PARAMS: u16 = 3141;
pub const ER_INVALID_JSON_BINARY_DATA: u16 = 3142;
pub const ER_INVALID_JSON_CHARSET: u16 = 3144;
pub const ER_INVALID_CAST_TO_JSON: u16 = 3147;
pub const ER_JSON_VALUE_TOO_BIG: u16 = 3150;
pub const ER_JSON_DOCUMENT_TOO_DEEP: u16 = 3157;
pub const ER_NOT_IMPLEMENTED_FOR_CARTESIAN_SRS: u16 = 3704;
pub const ER_NOT_IMPLEMENTED_FOR_PROJECTED_SRS: u16 = 3705;
pub const ER_NON_POSITIVE_RADIUS: u16 = 3706;

// server not available
pub const ER_SERVER_ISNT_AVAILABLE: u16 = 3168;

// SQL states for errors, from sql_state.h.

/// ER_SIGNAL_EXCEPTION in sql_state.h, but client.c uses
/// `const char *unknown_sqlstate = "HY000"`. So using that one.
pub const SS_UNKNOWN_SQL_STATE: &str = "HY000";
/// Network related error.
pub const SS_NET_ERROR: &str = "08S01";
pub const SS_WRONG_NUMBER_OF_COLUMNS: &str = "21000";
pub const SS_WRONG_VALUE_COUNT_ON_ROW: &str = "21S01";
pub const SS_DATA_TOO_LONG: &str = "22001";
pub const SS_DATA_OUT_OF_RANGE: &str = "22003";
pub const SS_CONSTRAINT_VIOLATION: &str = "23000";
pub const SS_CANT_DO_THIS_DURING_AN_TRANSACTION: &str = "25000";
pub const SS_ACCESS_DENIED_ERROR: &str = "28000";
pub const SS_NO_DB: &str = "3D000";
pub const SS_LOCK_DEADLOCK: &str = "40001";
pub const SS_CLIENT_ERROR: &str = "42000";
pub const SS_DUP_FIELD_NAME: &str = "42S21";
pub const SS_BAD_FIELD_ERROR: &str = "42S22";
pub const SS_UNKNOWN_TABLE: &str = "42S02";
pub const SS_QUERY_INTERRUPTED: &str = "70100";

/// State of a replication thread as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationState {
    Unknown,
    Stopped,
    Connecting,
    Running,
}

/// Convert an IO/SQL/applier thread status value from MySQL or
/// intermediate layers to a [`ReplicationState`]. Group Replication uses
/// "on" instead of "yes".
pub fn replication_status_to_state(s: &str) -> ReplicationState {
    match s.to_lowercase().as_str() {
        "yes" | "on" | "true" => ReplicationState::Running,
        "no" | "off" | "false" => ReplicationState::Stopped,
        "connecting" => ReplicationState::Connecting,
        _ => ReplicationState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replication_status_to_state() {
        assert_eq!(replication_status_to_state("Yes"), ReplicationState::Running);
        assert_eq!(replication_status_to_state("ON"), ReplicationState::Running);
        assert_eq!(replication_status_to_state("off"), ReplicationState::Stopped);
        assert_eq!(
            replication_status_to_state("Connecting"),
            ReplicationState::Connecting
        );
        assert_eq!(
            replication_status_to_state("anything else"),
            ReplicationState::Unknown
        );
    }

    #[test]
    fn test_auth_method_names() {
        assert_eq!(
            AuthMethodDescription::MysqlNativePassword.as_str(),
            "mysql_native_password"
        );
        assert_eq!(AuthMethodDescription::MysqlDialog.as_str(), "dialog");
    }

    #[test]
    fn test_status_flag_masks() {
        let status = SERVER_STATUS_IN_TRANS | SERVER_STATUS_AUTOCOMMIT;
        assert_eq!(status & NO_SERVER_STATUS_IN_TRANS, SERVER_STATUS_AUTOCOMMIT);
        assert_eq!(status & NO_SERVER_STATUS_AUTOCOMMIT, SERVER_STATUS_IN_TRANS);
    }
}
