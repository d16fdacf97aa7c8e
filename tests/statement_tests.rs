//! Tests for statement execution and fetching
//!
//! Queries are registered on the in-process driver with canned rows. NUMBER
//! columns carry decimal text, the way the client library hands them over.

use std::sync::Arc;

use bytes::Bytes;
use oracledb::constants::error_code;
use oracledb::driver::memory::{MemoryConnection, MemoryContext, MemoryResultSet, MemoryStmt};
use oracledb::driver::same_handle;
use oracledb::params::OptionMap;
use oracledb::{
    Context, Data, DataBuffer, DataTypeInfo, ExecMode, NativeType, NativeValue, OracleType,
    QueryInfo, Session, VarSpec,
};

const EMP_QUERY: &str = "select id, name from emp order by id";

fn text(value: &'static str) -> Data {
    Data::new(DataBuffer::Bytes(Bytes::from_static(value.as_bytes())))
}

fn connect() -> (Arc<MemoryContext>, Session) {
    let backend = MemoryContext::new();
    backend.register_query(
        EMP_QUERY,
        MemoryResultSet::new(vec![
            QueryInfo::new("ID", DataTypeInfo::new(OracleType::Number).with_precision(9, 0)),
            QueryInfo::new("NAME", DataTypeInfo::new(OracleType::Varchar).with_size(40)),
        ])
        .with_row(vec![text("1"), text("KING")])
        .with_row(vec![text("2"), Data::null()])
        .with_row(vec![text("3"), text("BLAKE")]),
    );
    let context = Context::new(backend.clone(), &OptionMap::new()).unwrap();
    let session = context.connect("scott", "tiger", "localhost/FREEPDB1", &OptionMap::new()).unwrap();
    (backend, session)
}

mod query_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fetch_all_rows() {
        let (_backend, session) = connect();
        let stmt = session.prepare_stmt(EMP_QUERY).unwrap();
        assert_eq!(stmt.execute(ExecMode::DEFAULT).unwrap(), 2);
        assert_eq!(stmt.num_query_columns().unwrap(), 2);
        assert_eq!(stmt.query_info(2).unwrap().name, "NAME");

        let mut rows = Vec::new();
        while let Some(row) = stmt.fetch().unwrap() {
            rows.push(row);
        }
        assert_eq!(
            rows,
            vec![
                vec![NativeValue::Integer(1), NativeValue::from("KING")],
                vec![NativeValue::Integer(2), NativeValue::Null],
                vec![NativeValue::Integer(3), NativeValue::from("BLAKE")],
            ]
        );
        assert_eq!(stmt.fetch().unwrap(), None);
    }

    #[test]
    fn test_explicit_define_with_filter() {
        let (_backend, session) = connect();
        let stmt = session.prepare_stmt(EMP_QUERY).unwrap();
        stmt.set_fetch_array_size(2).unwrap();
        stmt.execute(ExecMode::DEFAULT).unwrap();

        let ids = session
            .new_var(
                VarSpec::new(OracleType::Number, NativeType::Bytes)
                    .with_array_size(2)
                    .with_out_filter(oracledb::OutFilter::ToFloat),
            )
            .unwrap();
        stmt.define(1, &ids).unwrap();

        let first = stmt.fetch().unwrap().unwrap();
        assert_eq!(first, vec![NativeValue::Float(1.0), NativeValue::from("KING")]);
        let third = {
            stmt.fetch().unwrap();
            stmt.fetch().unwrap().unwrap()
        };
        assert_eq!(third[0], NativeValue::Float(3.0));
    }

    #[test]
    fn test_define_smaller_than_fetch_array() {
        let (_backend, session) = connect();
        let stmt = session.prepare_stmt(EMP_QUERY).unwrap();
        stmt.execute(ExecMode::DEFAULT).unwrap();
        let var = session
            .new_var(VarSpec::new(OracleType::Number, NativeType::Bytes).with_array_size(1))
            .unwrap();
        assert!(stmt.define(1, &var).unwrap_err().driver_info().is_some());
        assert!(stmt.define(0, &var).is_err());
    }

    #[test]
    fn test_fetch_before_execute() {
        let (_backend, session) = connect();
        let stmt = session.prepare_stmt(EMP_QUERY).unwrap();
        let err = stmt.fetch().unwrap_err();
        assert_eq!(err.driver_info().map(|i| i.code), Some(error_code::FETCH_OUT_OF_SEQUENCE));
    }

    #[test]
    fn test_unknown_table() {
        let (_backend, session) = connect();
        let stmt = session.prepare_stmt("select * from missing").unwrap();
        let err = stmt.execute(ExecMode::DEFAULT).unwrap_err();
        assert_eq!(err.driver_info().map(|i| i.code), Some(error_code::TABLE_NOT_FOUND));
        assert_eq!(stmt.execute(ExecMode::PARSE_ONLY).unwrap(), 0);
    }

    #[test]
    fn test_closed_statement() {
        let (_backend, session) = connect();
        let stmt = session.prepare_stmt(EMP_QUERY).unwrap();
        stmt.close().unwrap();
        assert!(stmt.execute(ExecMode::DEFAULT).is_err());
    }
}

mod bind_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_binds_reach_driver() {
        let (_backend, session) = connect();
        let stmt = session.prepare_stmt("update emp set name = :name where id = :1").unwrap();
        let name = session
            .new_var(VarSpec::new(OracleType::Varchar, NativeType::Bytes).with_size(10))
            .unwrap();
        name.set(0, &"FORD".into()).unwrap();
        let id = session
            .new_var(VarSpec::new(OracleType::Number, NativeType::Bytes))
            .unwrap();
        id.set(0, &NativeValue::Integer(7902)).unwrap();

        stmt.bind_by_name(":name", &name).unwrap();
        stmt.bind_by_pos(1, &id).unwrap();
        assert_eq!(stmt.execute(ExecMode::COMMIT_ON_SUCCESS).unwrap(), 0);

        let memory = stmt.handle().as_any().downcast_ref::<MemoryStmt>().unwrap();
        assert_eq!(memory.sql(), "update emp set name = :name where id = :1");
        let bound = memory.bind_named("name").unwrap();
        assert!(same_handle(&bound, name.handle()));
        assert!(same_handle(&memory.bind_at(1).unwrap(), id.handle()));
        assert!(memory.bind_at(2).is_none());
    }

    #[test]
    fn test_binds_kept_alive_by_statement() {
        let (_backend, session) = connect();
        let stmt = session.prepare_stmt("insert into emp (id) values (:1)").unwrap();
        {
            let var = session
                .new_var(VarSpec::new(OracleType::BinaryInteger, NativeType::Int64))
                .unwrap();
            var.set(0, &NativeValue::Integer(5)).unwrap();
            stmt.bind_by_pos(1, &var).unwrap();
        }
        assert!(format!("{:?}", stmt).contains("binds: 1"));
        let memory = stmt.handle().as_any().downcast_ref::<MemoryStmt>().unwrap();
        let kept = memory.bind_at(1).unwrap();
        assert!(matches!(kept.read_slot(0).unwrap().value, DataBuffer::Int64(5)));
    }
}

mod transaction_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_commit_and_rollback_counts() {
        let (_backend, session) = connect();
        session.commit().unwrap();
        session.commit().unwrap();
        session.rollback().unwrap();
        session.ping().unwrap();
        let conn = session.conn().as_any().downcast_ref::<MemoryConnection>().unwrap();
        assert_eq!(conn.transactions().commits, 2);
        assert_eq!(conn.transactions().rollbacks, 1);
    }

    #[test]
    fn test_versions() {
        let (_backend, session) = connect();
        assert_eq!(session.server_version().unwrap().version, 23);
        assert_eq!(session.context().client_version().release, 4);
    }

    #[test]
    fn test_pool_sessions_share_registry() {
        let (_backend, session) = connect();
        let pool = session
            .context()
            .create_pool("scott", "tiger", "db", &OptionMap::new())
            .unwrap();
        let pooled = pool.acquire(&OptionMap::new()).unwrap();
        let stmt = pooled.prepare_stmt(EMP_QUERY).unwrap();
        assert_eq!(stmt.execute(ExecMode::DEFAULT).unwrap(), 2);
        assert_eq!(pool.open_count().unwrap(), 1);
    }
}
