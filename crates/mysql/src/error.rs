//! SQL error type and classification
//!
//! [`SQLError`] carries the server error number, SQL state and message of
//! a MySQL-flavored failure. The predicates below classify failures for
//! the pooling and retry layers; they accept any `std::error::Error` and
//! downcast, so wrapped transport errors classify sensibly too.

use std::error::Error as StdError;

use crate::constants::*;

/// A MySQL protocol error with errno and SQL state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (errno {num}) (sqlstate {sql_state})")]
pub struct SQLError {
    pub num: u16,
    pub sql_state: String,
    pub message: String,
}

impl SQLError {
    pub fn new(num: u16, sql_state: &str, message: impl Into<String>) -> Self {
        SQLError {
            num,
            sql_state: sql_state.to_string(),
            message: message.into(),
        }
    }

    /// An error with the catch-all "HY000" SQL state.
    pub fn unspecified(num: u16, message: impl Into<String>) -> Self {
        SQLError::new(num, SS_UNKNOWN_SQL_STATE, message)
    }

    pub fn number(&self) -> u16 {
        self.num
    }
}

fn sql_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a SQLError> {
    err.downcast_ref::<SQLError>()
}

/// Whether the error is a connection-level error. "Too many connections"
/// is deliberately excluded: it is a capacity signal, not a network
/// fault.
pub fn is_conn_err(err: &(dyn StdError + 'static)) -> bool {
    if is_too_many_connections_err(err) {
        return false;
    }
    match sql_error(err) {
        Some(sql_err) => {
            let num = sql_err.number();
            (CR_UNKNOWN_ERROR..=CR_NAMED_PIPE_STATE_ERROR).contains(&num)
                || num == ER_QUERY_INTERRUPTED
        }
        None => false,
    }
}

/// Whether the connection was lost mid-query. Happens most commonly when
/// a query is killed server-side.
pub fn is_conn_lost_during_query(err: &(dyn StdError + 'static)) -> bool {
    matches!(sql_error(err), Some(sql_err) if sql_err.number() == CR_SERVER_LOST)
}

/// Whether the error is ephemeral and the caller should retry if
/// possible. Non-SQL errors are always treated as ephemeral.
pub fn is_ephemeral_error(err: &(dyn StdError + 'static)) -> bool {
    match sql_error(err) {
        Some(sql_err) => matches!(
            sql_err.number(),
            CR_CONNECTION_ERROR
                | CR_CONN_HOST_ERROR
                | CR_MALFORMED_PACKET
                | CR_NAMED_PIPE_STATE_ERROR
                | CR_SERVER_LOST
                | CR_SSL_CONNECTION_ERROR
                | ER_CANT_CREATE_THREAD
                | ER_DISK_FULL
                | ER_FORCING_CLOSE
                | ER_GOT_SIGNAL
                | ER_HOST_IS_BLOCKED
                | ER_LOCK_TABLE_FULL
                | ER_INNODB_READ_ONLY
                | ER_INTERNAL_ERROR
                | ER_LOCK_DEADLOCK
                | ER_LOCK_WAIT_TIMEOUT
                | ER_OUT_OF_MEMORY
                | ER_OUT_OF_RESOURCES
                | ER_OUT_OF_SORT_MEMORY
                | ER_QUERY_INTERRUPTED
                | ER_SERVER_ISNT_AVAILABLE
                | ER_SERVER_SHUTDOWN
                | ER_TOO_MANY_USER_CONNECTIONS
                | ER_UNKNOWN_ERROR
                | ER_USER_LIMIT_REACHED
        ),
        None => true,
    }
}

/// Whether the error is the handshake-time "Too many connections"
/// rejection.
pub fn is_too_many_connections_err(err: &(dyn StdError + 'static)) -> bool {
    match sql_error(err) {
        Some(sql_err) => {
            sql_err.number() == CR_SERVER_HANDSHAKE_ERR
                && sql_err.message.contains("Too many connections")
        }
        None => false,
    }
}

/// Whether the error is a MySQL error applying a schema change.
pub fn is_schema_apply_error(err: &(dyn StdError + 'static)) -> bool {
    match sql_error(err) {
        Some(sql_err) => matches!(
            sql_err.number(),
            ER_DUP_KEY_NAME | ER_CANT_DROP_FIELD_OR_KEY | ER_TABLE_EXISTS | ER_DUP_FIELD_NAME
        ),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(num: u16, message: &str) -> SQLError {
        SQLError::unspecified(num, message)
    }

    #[test]
    fn test_display_shape() {
        let e = SQLError::new(ER_NO_SUCH_TABLE, SS_UNKNOWN_TABLE, "table 't1' doesn't exist");
        assert_eq!(
            e.to_string(),
            "table 't1' doesn't exist (errno 1146) (sqlstate 42S02)"
        );
    }

    #[test]
    fn test_is_conn_err() {
        assert!(is_conn_err(&err(CR_SERVER_GONE, "gone")));
        assert!(is_conn_err(&err(CR_CONNECTION_ERROR, "refused")));
        assert!(is_conn_err(&err(ER_QUERY_INTERRUPTED, "killed")));
        assert!(!is_conn_err(&err(ER_NO_SUCH_TABLE, "missing")));
        // Above the connection error band.
        assert!(!is_conn_err(&err(CR_CANT_READ_CHARSET, "charset")));
    }

    #[test]
    fn test_too_many_connections_is_not_a_conn_err() {
        let too_many = err(CR_SERVER_HANDSHAKE_ERR, "Too many connections");
        assert!(is_too_many_connections_err(&too_many));
        assert!(!is_conn_err(&too_many));

        // A handshake error with another message stays a connection
        // error.
        let other = err(CR_SERVER_HANDSHAKE_ERR, "handshake failed");
        assert!(!is_too_many_connections_err(&other));
        assert!(is_conn_err(&other));
    }

    #[test]
    fn test_is_conn_lost_during_query() {
        assert!(is_conn_lost_during_query(&err(CR_SERVER_LOST, "lost")));
        assert!(!is_conn_lost_during_query(&err(CR_SERVER_GONE, "gone")));
    }

    #[test]
    fn test_is_ephemeral_error() {
        for num in [
            CR_SERVER_LOST,
            ER_LOCK_WAIT_TIMEOUT,
            ER_OUT_OF_MEMORY,
            ER_HOST_IS_BLOCKED,
            ER_SERVER_SHUTDOWN,
            ER_QUERY_INTERRUPTED,
            ER_LOCK_DEADLOCK,
            ER_TOO_MANY_USER_CONNECTIONS,
        ] {
            assert!(is_ephemeral_error(&err(num, "x")), "errno {num}");
        }
        assert!(!is_ephemeral_error(&err(ER_NO_SUCH_TABLE, "missing")));
        assert!(!is_ephemeral_error(&err(ER_PARSE_ERROR, "syntax")));

        // Non-SQL errors are assumed ephemeral.
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(is_ephemeral_error(&io_err));
    }

    #[test]
    fn test_is_schema_apply_error() {
        assert!(is_schema_apply_error(&err(ER_TABLE_EXISTS, "exists")));
        assert!(is_schema_apply_error(&err(ER_DUP_KEY_NAME, "dup")));
        assert!(!is_schema_apply_error(&err(ER_NO_SUCH_TABLE, "missing")));
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "io");
        assert!(!is_schema_apply_error(&io_err));
    }
}
