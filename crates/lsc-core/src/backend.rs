//! Execution backend contract
//!
//! The query subsystem never talks to a database itself. Every terminal
//! operation compiles to SQL text plus positional arguments and hands both to
//! an [`ExecutionBackend`] together with the name of the isolation space.

use crate::value::{Record, Value};
use async_trait::async_trait;

/// Name of the space used when a caller does not pick one
pub const DEFAULT_SPACE: &str = "default";

/// Trait for the component that actually runs SQL
///
/// Errors are backend-defined and travel back to the caller unchanged.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run a read statement and return the materialized rows
    async fn query(
        &self,
        sql: &str,
        args: &[Value],
        space: &str,
    ) -> std::result::Result<Vec<Record>, Self::Error>;

    /// Run an UPDATE and return the number of affected rows
    async fn update(
        &self,
        sql: &str,
        args: &[Value],
        space: &str,
    ) -> std::result::Result<u64, Self::Error>;

    /// Run a DELETE and return the number of affected rows
    async fn delete(
        &self,
        sql: &str,
        args: &[Value],
        space: &str,
    ) -> std::result::Result<u64, Self::Error>;
}

#[async_trait]
impl<B: ExecutionBackend + ?Sized> ExecutionBackend for std::sync::Arc<B> {
    type Error = B::Error;

    async fn query(
        &self,
        sql: &str,
        args: &[Value],
        space: &str,
    ) -> std::result::Result<Vec<Record>, Self::Error> {
        (**self).query(sql, args, space).await
    }

    async fn update(
        &self,
        sql: &str,
        args: &[Value],
        space: &str,
    ) -> std::result::Result<u64, Self::Error> {
        (**self).update(sql, args, space).await
    }

    async fn delete(
        &self,
        sql: &str,
        args: &[Value],
        space: &str,
    ) -> std::result::Result<u64, Self::Error> {
        (**self).delete(sql, args, space).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, thiserror::Error)]
    #[error("closed")]
    struct Closed;

    struct EchoBackend;

    #[async_trait]
    impl ExecutionBackend for EchoBackend {
        type Error = Closed;

        async fn query(
            &self,
            sql: &str,
            args: &[Value],
            space: &str,
        ) -> std::result::Result<Vec<Record>, Closed> {
            let mut row = Record::new();
            row.insert("sql".to_string(), Value::from(sql));
            row.insert("args".to_string(), Value::from(args.len() as i64));
            row.insert("space".to_string(), Value::from(space));
            Ok(vec![row])
        }

        async fn update(&self, _: &str, args: &[Value], _: &str) -> std::result::Result<u64, Closed> {
            Ok(args.len() as u64)
        }

        async fn delete(&self, _: &str, _: &[Value], _: &str) -> std::result::Result<u64, Closed> {
            Err(Closed)
        }
    }

    #[tokio::test]
    async fn test_arc_backend_delegates() {
        let backend = Arc::new(EchoBackend);
        let rows = backend
            .query("SELECT 1", &[Value::Integer(1)], DEFAULT_SPACE)
            .await
            .unwrap();
        assert_eq!(rows[0]["space"], Value::from("default"));
        assert_eq!(rows[0]["args"], Value::Integer(1));

        assert_eq!(backend.update("UPDATE t", &[Value::Null, Value::Null, Value::Null], "s").await.unwrap(), 3);
        assert!(backend.delete("DELETE FROM t", &[], "s").await.is_err());
    }
}
