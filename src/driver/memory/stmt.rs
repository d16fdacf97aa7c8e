//! Reference statement serving canned result sets

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{driver_error, Registry};
use crate::constants::{error_code, ExecMode};
use crate::data::Data;
use crate::driver::{DriverResult, StmtBackend, VarHandle};
use crate::info::QueryInfo;

/// Rows fetched per round trip unless changed
pub const DEFAULT_FETCH_ARRAY_SIZE: u32 = 100;

/// Columns and rows returned by a registered query.
///
/// Row values are stored as the defined variables expect them, so a NUMBER
/// column carries its decimal text as `Bytes`.
#[derive(Debug, Clone, Default)]
pub struct MemoryResultSet {
    columns: Vec<QueryInfo>,
    rows: Vec<Vec<Data>>,
}

impl MemoryResultSet {
    /// Empty result with the given select list
    pub fn new(columns: Vec<QueryInfo>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, one value per column
    pub fn with_row(mut self, row: Vec<Data>) -> Self {
        self.rows.push(row);
        self
    }
}

#[derive(Debug)]
struct StmtState {
    result: Option<MemoryResultSet>,
    next_row: usize,
    fetch_array_size: u32,
    binds_by_pos: HashMap<u32, VarHandle>,
    binds_by_name: HashMap<String, VarHandle>,
    defines: HashMap<u32, VarHandle>,
    is_closed: bool,
}

/// Reference statement
#[derive(Debug)]
pub struct MemoryStmt {
    sql: String,
    registry: Arc<Registry>,
    state: Mutex<StmtState>,
}

impl MemoryStmt {
    pub(crate) fn new(sql: &str, registry: Arc<Registry>) -> Self {
        Self {
            sql: sql.to_string(),
            registry,
            state: Mutex::new(StmtState {
                result: None,
                next_row: 0,
                fetch_array_size: DEFAULT_FETCH_ARRAY_SIZE,
                binds_by_pos: HashMap::new(),
                binds_by_name: HashMap::new(),
                defines: HashMap::new(),
                is_closed: false,
            }),
        }
    }

    /// SQL text the statement was prepared with
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Variable bound at 1-based `pos`
    pub fn bind_at(&self, pos: u32) -> Option<VarHandle> {
        self.state.lock().binds_by_pos.get(&pos).cloned()
    }

    /// Variable bound to `name`
    pub fn bind_named(&self, name: &str) -> Option<VarHandle> {
        self.state.lock().binds_by_name.get(name).cloned()
    }

    fn locked(&self, fn_name: &str) -> DriverResult<parking_lot::MutexGuard<'_, StmtState>> {
        let state = self.state.lock();
        if state.is_closed {
            return Err(driver_error(error_code::CLIENT, "DPI-1039: statement was already closed", fn_name));
        }
        Ok(state)
    }

    fn is_query(&self) -> bool {
        let head = self.sql.trim_start();
        let keyword = head.split_whitespace().next().unwrap_or("");
        keyword.eq_ignore_ascii_case("select") || keyword.eq_ignore_ascii_case("with")
    }
}

impl StmtBackend for MemoryStmt {
    fn execute(&self, mode: ExecMode) -> DriverResult<u32> {
        let mut state = self.locked("execute")?;
        match self.registry.query(&self.sql) {
            Some(result) => {
                let num_columns = result.columns.len() as u32;
                state.result = Some(result);
                state.next_row = 0;
                Ok(num_columns)
            }
            None if self.is_query() && !mode.contains(ExecMode::PARSE_ONLY) => Err(driver_error(
                error_code::TABLE_NOT_FOUND,
                "table or view does not exist",
                "execute",
            )),
            None => {
                state.result = None;
                Ok(0)
            }
        }
    }

    fn fetch(&self) -> DriverResult<Option<u32>> {
        let mut state = self.locked("fetch")?;
        let Some(result) = &state.result else {
            return Err(driver_error(
                error_code::FETCH_OUT_OF_SEQUENCE,
                "fetch out of sequence",
                "fetch",
            ));
        };
        let Some(row) = result.rows.get(state.next_row) else {
            return Ok(None);
        };
        let buffer_row = (state.next_row % state.fetch_array_size as usize) as u32;
        for (i, data) in row.iter().enumerate() {
            let pos = i as u32 + 1;
            let var = state.defines.get(&pos).ok_or_else(|| {
                driver_error(
                    error_code::CLIENT,
                    format!("DPI-1059: column {} is not defined", pos),
                    "fetch",
                )
            })?;
            var.write_slot(buffer_row, data.clone())?;
        }
        state.next_row += 1;
        Ok(Some(buffer_row))
    }

    fn bind_by_pos(&self, pos: u32, var: &VarHandle) -> DriverResult<()> {
        self.locked("bind_by_pos")?.binds_by_pos.insert(pos, var.clone());
        Ok(())
    }

    fn bind_by_name(&self, name: &str, var: &VarHandle) -> DriverResult<()> {
        let name = name.trim_start_matches(':').to_string();
        self.locked("bind_by_name")?.binds_by_name.insert(name, var.clone());
        Ok(())
    }

    fn define(&self, pos: u32, var: &VarHandle) -> DriverResult<()> {
        let mut state = self.locked("define")?;
        if var.array_size() < state.fetch_array_size {
            return Err(driver_error(
                error_code::CLIENT,
                format!(
                    "DPI-1018: array size of {} is too small for fetch array size {}",
                    var.array_size(),
                    state.fetch_array_size
                ),
                "define",
            ));
        }
        state.defines.insert(pos, var.clone());
        Ok(())
    }

    fn query_info(&self, pos: u32) -> DriverResult<QueryInfo> {
        let state = self.locked("query_info")?;
        state
            .result
            .as_ref()
            .and_then(|r| r.columns.get(pos.checked_sub(1)? as usize))
            .cloned()
            .ok_or_else(|| {
                driver_error(
                    error_code::CLIENT,
                    format!("DPI-1028: query position {} is invalid", pos),
                    "query_info",
                )
            })
    }

    fn num_query_columns(&self) -> DriverResult<u32> {
        let state = self.locked("num_query_columns")?;
        Ok(state.result.as_ref().map_or(0, |r| r.columns.len() as u32))
    }

    fn fetch_array_size(&self) -> DriverResult<u32> {
        Ok(self.locked("fetch_array_size")?.fetch_array_size)
    }

    fn set_fetch_array_size(&self, size: u32) -> DriverResult<()> {
        self.locked("set_fetch_array_size")?.fetch_array_size = if size == 0 {
            DEFAULT_FETCH_ARRAY_SIZE
        } else {
            size
        };
        Ok(())
    }

    fn close(&self) -> DriverResult<()> {
        let mut state = self.locked("close")?;
        state.is_closed = true;
        state.defines.clear();
        state.binds_by_pos.clear();
        state.binds_by_name.clear();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Statement handle for `sql` against a bare registry, for unit tests
#[cfg(test)]
pub(crate) fn test_stmt(sql: &str, result: Option<MemoryResultSet>) -> crate::driver::StmtHandle {
    let registry = Arc::new(Registry::default());
    if let Some(result) = result {
        registry.queries.lock().insert(sql.to_string(), result);
    }
    Arc::new(MemoryStmt::new(sql, registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{NativeType, OracleType};
    use crate::data::DataBuffer;
    use crate::driver::memory::MemoryVar;
    use crate::info::DataTypeInfo;
    use crate::var::VarSpec;

    fn result() -> MemoryResultSet {
        MemoryResultSet::new(vec![QueryInfo::new("ID", DataTypeInfo::new(OracleType::BinaryInteger))])
            .with_row(vec![Data::new(DataBuffer::Int64(1))])
            .with_row(vec![Data::new(DataBuffer::Int64(2))])
            .with_row(vec![Data::new(DataBuffer::Int64(3))])
    }

    #[test]
    fn test_fetch_wraps_buffer_rows() {
        let stmt = test_stmt("select id from t", Some(result()));
        assert_eq!(stmt.execute(ExecMode::DEFAULT).unwrap(), 1);
        stmt.set_fetch_array_size(2).unwrap();
        let var: VarHandle = Arc::new(
            MemoryVar::new(&VarSpec::new(OracleType::BinaryInteger, NativeType::Int64).with_array_size(2)).unwrap(),
        );
        stmt.define(1, &var).unwrap();
        assert_eq!(stmt.fetch().unwrap(), Some(0));
        assert_eq!(stmt.fetch().unwrap(), Some(1));
        assert_eq!(stmt.fetch().unwrap(), Some(0));
        assert!(matches!(var.read_slot(0).unwrap().value, DataBuffer::Int64(3)));
        assert_eq!(stmt.fetch().unwrap(), None);
    }

    #[test]
    fn test_fetch_before_execute() {
        let stmt = test_stmt("select id from t", Some(result()));
        assert_eq!(stmt.fetch().unwrap_err().code, error_code::FETCH_OUT_OF_SEQUENCE);
    }

    #[test]
    fn test_unknown_query() {
        let stmt = test_stmt("select * from missing", None);
        assert_eq!(stmt.execute(ExecMode::DEFAULT).unwrap_err().code, error_code::TABLE_NOT_FOUND);
        let stmt = test_stmt("begin null; end;", None);
        assert_eq!(stmt.execute(ExecMode::DEFAULT).unwrap(), 0);
    }
}
