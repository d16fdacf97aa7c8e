//! SQL Statement handling
//!
//! A [`Stmt`] wraps a prepared driver statement. Variables bound or defined
//! on it are kept alive for as long as the statement, since the driver reads
//! and writes their slots on every execute and fetch.
//!
//! [`Stmt::fetch`] defines any missing select-list column from the query
//! metadata before the first fetch, sized to the fetch array size.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::constants::ExecMode;
use crate::driver::StmtHandle;
use crate::error::{Error, Result};
use crate::info::QueryInfo;
use crate::session::Session;
use crate::value::NativeValue;
use crate::var::{Var, VarSpec};

#[derive(Default)]
struct StmtVars {
    binds: Vec<Var>,
    defines: Vec<Option<Var>>,
}

/// Prepared statement bound to a session
#[derive(Clone)]
pub struct Stmt {
    handle: StmtHandle,
    session: Session,
    vars: Arc<Mutex<StmtVars>>,
}

impl Stmt {
    /// Wrap a driver statement handle
    pub fn new(handle: StmtHandle, session: Session) -> Self {
        Self {
            handle,
            session,
            vars: Arc::new(Mutex::new(StmtVars::default())),
        }
    }

    /// Driver handle
    pub fn handle(&self) -> &StmtHandle {
        &self.handle
    }

    /// Owning session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Execute, returning the number of select-list columns
    pub fn execute(&self, mode: ExecMode) -> Result<u32> {
        let num_columns = self.handle.execute(mode)?;
        tracing::trace!(num_columns, mode = mode.bits(), "statement executed");
        Ok(num_columns)
    }

    /// Bind `var` at 1-based position `pos`
    pub fn bind_by_pos(&self, pos: u32, var: &Var) -> Result<()> {
        self.handle.bind_by_pos(pos, var.handle())?;
        self.vars.lock().binds.push(var.clone());
        Ok(())
    }

    /// Bind `var` to the placeholder `name`
    pub fn bind_by_name(&self, name: &str, var: &Var) -> Result<()> {
        self.handle.bind_by_name(name, var.handle())?;
        self.vars.lock().binds.push(var.clone());
        Ok(())
    }

    /// Define `var` as the fetch buffer of 1-based column `pos`
    pub fn define(&self, pos: u32, var: &Var) -> Result<()> {
        let index = pos
            .checked_sub(1)
            .ok_or_else(|| Error::invalid_argument("define positions start at 1"))? as usize;
        self.handle.define(pos, var.handle())?;
        let mut vars = self.vars.lock();
        if vars.defines.len() <= index {
            vars.defines.resize(index + 1, None);
        }
        vars.defines[index] = Some(var.clone());
        Ok(())
    }

    /// Description of 1-based column `pos`
    pub fn query_info(&self, pos: u32) -> Result<QueryInfo> {
        Ok(self.handle.query_info(pos)?)
    }

    /// Number of select-list columns
    pub fn num_query_columns(&self) -> Result<u32> {
        Ok(self.handle.num_query_columns()?)
    }

    /// Rows fetched per round trip
    pub fn fetch_array_size(&self) -> Result<u32> {
        Ok(self.handle.fetch_array_size()?)
    }

    /// Set the rows fetched per round trip
    pub fn set_fetch_array_size(&self, size: u32) -> Result<()> {
        Ok(self.handle.set_fetch_array_size(size)?)
    }

    fn define_missing(&self) -> Result<Vec<Var>> {
        let num_columns = self.num_query_columns()?;
        let defined: Vec<Option<Var>> = {
            let vars = self.vars.lock();
            (0..num_columns as usize)
                .map(|i| vars.defines.get(i).cloned().flatten())
                .collect()
        };
        if defined.iter().all(Option::is_some) {
            return Ok(defined.into_iter().flatten().collect());
        }
        let array_size = self.fetch_array_size()?;
        let mut columns = Vec::with_capacity(defined.len());
        for (i, var) in defined.into_iter().enumerate() {
            let pos = i as u32 + 1;
            let var = match var {
                Some(var) => var,
                None => {
                    let info = self.query_info(pos)?;
                    let spec = VarSpec::from_type_info(&info.type_info, &self.session)?
                        .with_array_size(array_size);
                    let var = self.session.new_var(spec)?;
                    self.define(pos, &var)?;
                    tracing::trace!(pos, column = info.name.as_str(), "column defined");
                    var
                }
            };
            columns.push(var);
        }
        Ok(columns)
    }

    /// Fetch the next row, or `None` when the result set is exhausted
    pub fn fetch(&self) -> Result<Option<Vec<NativeValue>>> {
        let columns = self.define_missing()?;
        let Some(row) = self.handle.fetch()? else {
            return Ok(None);
        };
        columns.iter().map(|var| var.get(row)).collect::<Result<Vec<_>>>().map(Some)
    }

    /// Close the statement; later operations fail
    pub fn close(&self) -> Result<()> {
        Ok(self.handle.close()?)
    }
}

impl fmt::Debug for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vars = self.vars.lock();
        f.debug_struct("Stmt")
            .field("handle", &self.handle)
            .field("binds", &vars.binds.len())
            .field("defines", &vars.defines.iter().filter(|v| v.is_some()).count())
            .finish()
    }
}
