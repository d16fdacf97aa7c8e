//! Tests for keyword options on contexts, sessions and pools

use oracledb::constants::error_code;
use oracledb::driver::memory::{MemoryConnection, MemoryContext};
use oracledb::params::{options, OptionMap, ParamValue};
use oracledb::{
    AuthMode, Context, ContextCreateParams, CreateMode, Error, PoolCreateParams, PoolGetMode, Purity,
    SodaOperOptions,
};

mod context_option_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_context_options_reach_driver() {
        let backend = MemoryContext::new();
        let context = Context::new(
            backend.clone(),
            &options([("default_driver_name", "loader : 1.0".into())]),
        )
        .unwrap();
        assert_eq!(context.params().default_driver_name.as_deref(), Some("loader : 1.0"));
        assert_eq!(
            backend.params(),
            Some(ContextCreateParams::default().with_default_driver_name("loader : 1.0"))
        );
    }

    #[test]
    fn test_unknown_context_option() {
        let err = Context::new(MemoryContext::new(), &options([("driver", "x".into())])).unwrap_err();
        assert!(matches!(err, Error::UnknownOptions(ref keys) if keys == &["driver"]));
    }
}

mod connect_option_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn context() -> Context {
        Context::new(MemoryContext::new(), &OptionMap::new()).unwrap()
    }

    #[test]
    fn test_unknown_keys_reported_together() {
        let err = context()
            .connect(
                "scott",
                "tiger",
                "db",
                &options([("bogus1", 1.into()), ("stmt_cache_size", 5.into()), ("bogus2", true.into())]),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown keywords: bogus1, bogus2");
    }

    #[test]
    fn test_common_and_conn_tables() {
        let session = context()
            .connect(
                "scott",
                "tiger",
                "db",
                &options([
                    ("stmt_cache_size", 40.into()),
                    ("purity", "new".into()),
                    ("auth_mode", vec!["sysdba"].into()),
                ]),
            )
            .unwrap();
        let conn = session.conn().as_any().downcast_ref::<MemoryConnection>().unwrap();
        assert_eq!(conn.stmt_cache_size(), 40);
    }

    #[test]
    fn test_wrong_value_types() {
        let context = context();
        let err = context
            .connect("scott", "tiger", "db", &options([("stmt_cache_size", "many".into())]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { ref name, .. } if name == "stmt_cache_size"));

        let err = context
            .connect("scott", "tiger", "db", &options([("purity", "murky".into())]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { ref name, .. } if name == "purity"));
    }

    #[test]
    fn test_missing_credentials() {
        let err = context().connect("", "", "db", &OptionMap::new()).unwrap_err();
        assert_eq!(err.driver_info().map(|i| i.code), Some(error_code::INVALID_CREDENTIALS));
        context()
            .connect("", "", "db", &options([("external_auth", true.into())]))
            .unwrap();
    }

    #[test]
    fn test_typed_params() {
        let opts = options([
            ("purity", ParamValue::Int(2)),
            ("auth_mode", "sysoper".into()),
            ("connection_class", "BATCH".into()),
            ("create_mode", vec!["threaded", "events"].into()),
        ]);
        let (common, conn) = oracledb::ConnCreateParams::with_common_from_options(&opts).unwrap();
        assert_eq!(conn.purity, Purity::SelfPurity);
        assert_eq!(conn.auth_mode, AuthMode::SYSOPER);
        assert_eq!(conn.connection_class.as_deref(), Some("BATCH"));
        assert_eq!(common.create_mode, CreateMode::THREADED | CreateMode::EVENTS);
    }
}

mod pool_option_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pool_sessions() {
        let context = Context::new(MemoryContext::new(), &OptionMap::new()).unwrap();
        let pool = context
            .create_pool(
                "scott",
                "tiger",
                "db",
                &options([("min_sessions", 1.into()), ("max_sessions", 2.into())]),
            )
            .unwrap();
        let first = pool.acquire(&OptionMap::new()).unwrap();
        let _second = pool.acquire(&OptionMap::new()).unwrap();
        assert_eq!(pool.open_count().unwrap(), 2);

        let err = pool.acquire(&OptionMap::new()).unwrap_err();
        assert_eq!(err.driver_info().map(|i| i.code), Some(error_code::POOL_EXHAUSTED));

        drop(first);
        pool.acquire(&OptionMap::new()).unwrap();
    }

    #[test]
    fn test_force_get_ignores_limit() {
        let context = Context::new(MemoryContext::new(), &OptionMap::new()).unwrap();
        let pool = context
            .create_pool("scott", "tiger", "db", &options([("get_mode", "forceget".into())]))
            .unwrap();
        let _a = pool.acquire(&OptionMap::new()).unwrap();
        let _b = pool.acquire(&OptionMap::new()).unwrap();
        assert_eq!(pool.open_count().unwrap(), 2);
    }

    #[test]
    fn test_bad_bounds() {
        let context = Context::new(MemoryContext::new(), &OptionMap::new()).unwrap();
        let err = context
            .create_pool(
                "scott",
                "tiger",
                "db",
                &options([("min_sessions", 5.into()), ("max_sessions", 2.into())]),
            )
            .unwrap_err();
        assert!(err.driver_info().is_some());
    }

    #[test]
    fn test_closed_pool() {
        let context = Context::new(MemoryContext::new(), &OptionMap::new()).unwrap();
        let pool = context.create_pool("scott", "tiger", "db", &OptionMap::new()).unwrap();
        pool.close().unwrap();
        assert!(pool.acquire(&OptionMap::new()).is_err());
    }

    #[test]
    fn test_pool_params_from_options() {
        let pool = PoolCreateParams::from_options(&options([
            ("session_increment", 2.into()),
            ("ping_interval", (-1).into()),
            ("homogeneous", false.into()),
            ("get_mode", "nowait".into()),
        ]))
        .unwrap();
        assert_eq!(pool.session_increment, 2);
        assert_eq!(pool.ping_interval, -1);
        assert!(!pool.homogeneous);
        assert_eq!(pool.get_mode, PoolGetMode::NoWait);
    }
}

mod soda_option_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keys_and_window() {
        let opts = SodaOperOptions::from_options(&options([
            ("keys", vec!["k1", "k2"].into()),
            ("skip", 10.into()),
            ("limit", 5.into()),
            ("filter", r#"{"name": "x"}"#.into()),
        ]))
        .unwrap();
        assert_eq!(
            opts,
            SodaOperOptions::default()
                .with_keys(["k1", "k2"])
                .with_window(10, 5)
                .with_filter(r#"{"name": "x"}"#)
        );
    }

    #[test]
    fn test_single_key_becomes_list() {
        let opts = SodaOperOptions::from_options(&options([("keys", "only".into())])).unwrap();
        assert_eq!(opts.keys, vec!["only"]);
    }
}
