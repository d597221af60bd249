//! Transaction helper

use rusqlite::{Connection, Transaction, TransactionBehavior};

use super::Result;

/// Run `operation` inside a transaction, committing on `Ok`.
///
/// An `Err` drops the transaction, which rolls it back.
pub fn execute_in_transaction<F, T>(
    conn: &mut Connection,
    behavior: TransactionBehavior,
    operation: F,
) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn.transaction_with_behavior(behavior)?;
    let result = operation(&tx)?;
    tx.commit()?;
    Ok(result)
}
