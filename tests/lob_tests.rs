//! Tests for LOB streaming
//!
//! Character LOBs count UTF-16 code units, so a four-byte UTF-8 character
//! advances the stream by two.

use std::io::SeekFrom;
use std::sync::Arc;

use oracledb::constants::error_code;
use oracledb::driver::memory::MemoryContext;
use oracledb::params::OptionMap;
use oracledb::{Context, Error, Lob, NativeType, NativeValue, OracleType, Session, VarSpec};

fn connect() -> (Arc<MemoryContext>, Session) {
    let backend = MemoryContext::new();
    let context = Context::new(backend.clone(), &OptionMap::new()).unwrap();
    let session = context.connect("scott", "tiger", "localhost/FREEPDB1", &OptionMap::new()).unwrap();
    (backend, session)
}

fn code(err: &Error) -> Option<i32> {
    err.driver_info().map(|i| i.code)
}

mod clob_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_reports_characters() {
        let (_backend, session) = connect();
        let mut lob = session.new_temp_lob(OracleType::Clob).unwrap();
        assert!(lob.is_char());
        assert_eq!(lob.write("Aé中😀".as_bytes()).unwrap(), 5);
        assert_eq!(lob.position(), 5);
        assert_eq!(lob.size().unwrap(), 5);
    }

    #[test]
    fn test_read_to_end() {
        let (_backend, session) = connect();
        let mut lob = session.new_temp_lob(OracleType::Clob).unwrap();
        lob.set("Aé中😀".as_bytes()).unwrap();
        lob.seek(SeekFrom::Start(0)).unwrap();

        let all = lob.read(None).unwrap().unwrap();
        assert_eq!(&all[..], "Aé中😀".as_bytes());
        assert_eq!(lob.position(), 5);
        assert_eq!(lob.read(None).unwrap().unwrap().len(), 0);
        assert_eq!(lob.read(Some(3)).unwrap(), None);
    }

    #[test]
    fn test_read_in_pieces() {
        let (_backend, session) = connect();
        let mut lob = session.new_temp_lob(OracleType::Clob).unwrap();
        lob.set(b"hello world").unwrap();
        lob.seek(SeekFrom::Start(0)).unwrap();

        assert_eq!(&lob.read(Some(5)).unwrap().unwrap()[..], b"hello");
        lob.seek(SeekFrom::Current(1)).unwrap();
        assert_eq!(&lob.read(Some(100)).unwrap().unwrap()[..], b"world");
        assert_eq!(lob.seek(SeekFrom::End(-5)).unwrap(), 6);
        assert!(matches!(lob.seek(SeekFrom::Current(-10)), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_read_bytes_size() {
        let (_backend, session) = connect();
        let lob = session.new_temp_lob(OracleType::NClob).unwrap();
        assert_eq!(lob.set_from_bytes("x😀y".as_bytes()).unwrap(), 4);
        let (bytes, size) = lob.read_bytes(2, 2).unwrap();
        assert_eq!(&bytes[..], "😀".as_bytes());
        assert_eq!(size, 2);
    }

    #[test]
    fn test_malformed_utf8() {
        let (_backend, session) = connect();
        let mut lob = session.new_temp_lob(OracleType::Clob).unwrap();
        assert!(matches!(lob.write(&[b'a', 0xFF]), Err(Error::Encoding(_))));
        assert!(matches!(lob.write(&[0xE4, 0xB8]), Err(Error::Encoding(_))));
        assert_eq!(lob.position(), 0);
        assert_eq!(lob.size().unwrap(), 0);
    }

    #[test]
    fn test_write_past_end_pads_with_spaces() {
        let (_backend, session) = connect();
        let lob = session.new_temp_lob(OracleType::Clob).unwrap();
        lob.write_bytes(3, b"z").unwrap();
        let (bytes, size) = lob.read_bytes(1, 10).unwrap();
        assert_eq!(&bytes[..], b"  z");
        assert_eq!(size, 3);
    }
}

mod blob_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sizes_are_bytes() {
        let (_backend, session) = connect();
        let mut lob = session.new_temp_lob(OracleType::Blob).unwrap();
        assert!(!lob.is_char());
        assert_eq!(lob.write(&[0xFF, 0x00, 0xF0]).unwrap(), 3);
        assert_eq!(lob.size().unwrap(), 3);
        lob.seek(SeekFrom::Start(1)).unwrap();
        assert_eq!(&lob.read(None).unwrap().unwrap()[..], &[0x00, 0xF0]);
    }

    #[test]
    fn test_trim() {
        let (_backend, session) = connect();
        let lob = session.new_temp_lob(OracleType::Blob).unwrap();
        lob.set_from_bytes(b"abcdef").unwrap();
        lob.trim(2).unwrap();
        assert_eq!(lob.size().unwrap(), 2);
        let err = lob.trim(10).unwrap_err();
        assert_eq!(code(&err), Some(error_code::TRIM_LENGTH_EXCEEDED));
    }

    #[test]
    fn test_resource_and_close() {
        let (_backend, session) = connect();
        let lob = session.new_temp_lob(OracleType::Blob).unwrap();
        assert_eq!(lob.chunk_size().unwrap(), 8132);
        lob.open_resource().unwrap();
        assert!(lob.is_resource_open().unwrap());
        lob.close_resource().unwrap();
        assert_eq!(code(&lob.close_resource().unwrap_err()), Some(error_code::LOB_NOT_OPEN));

        lob.close().unwrap();
        assert_eq!(code(&lob.size().unwrap_err()), Some(error_code::INVALID_LOB_LOCATOR));
    }

    #[test]
    fn test_copy_is_independent() {
        let (_backend, session) = connect();
        let mut lob = session.new_temp_lob(OracleType::Blob).unwrap();
        lob.write(b"abc").unwrap();
        let copy = lob.copy().unwrap();
        assert_eq!(copy.position(), 3);
        copy.set_from_bytes(b"z").unwrap();
        assert_eq!(lob.size().unwrap(), 3);
        assert_eq!(copy.size().unwrap(), 1);
    }

    #[test]
    fn test_bfile_ops_rejected() {
        let (_backend, session) = connect();
        let lob = session.new_temp_lob(OracleType::Blob).unwrap();
        assert_eq!(code(&lob.file_exists().unwrap_err()), Some(error_code::CLIENT));
    }

    #[test]
    fn test_temporary_bfile_rejected() {
        let (_backend, session) = connect();
        assert!(session.new_temp_lob(OracleType::Bfile).is_err());
    }
}

mod bfile_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_registered_file() {
        let (backend, session) = connect();
        backend.add_file("DATA_DIR", "notes.txt", b"file body");
        let mut lob = Lob::new(backend.new_bfile("DATA_DIR", "notes.txt"), session);

        assert_eq!(lob.lob_type(), OracleType::Bfile);
        assert!(lob.file_exists().unwrap());
        assert_eq!(
            lob.directory_and_file_name().unwrap(),
            ("DATA_DIR".to_string(), "notes.txt".to_string())
        );
        assert_eq!(lob.size().unwrap(), 9);
        assert_eq!(&lob.read(None).unwrap().unwrap()[..], b"file body");
    }

    #[test]
    fn test_missing_file() {
        let (backend, session) = connect();
        let lob = Lob::new(backend.new_bfile("DATA_DIR", "gone.bin"), session);
        assert!(!lob.file_exists().unwrap());
        assert_eq!(code(&lob.size().unwrap_err()), Some(error_code::FILE_NOT_FOUND));

        backend.add_file("OTHER_DIR", "here.bin", &[1, 2]);
        lob.set_directory_and_file_name("OTHER_DIR", "here.bin").unwrap();
        assert_eq!(lob.size().unwrap(), 2);
    }

    #[test]
    fn test_read_only() {
        let (backend, session) = connect();
        backend.add_file("DATA_DIR", "ro.bin", b"x");
        let lob = Lob::new(backend.new_bfile("DATA_DIR", "ro.bin"), session);
        assert!(lob.set_from_bytes(b"y").is_err());
    }
}

mod lob_var_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lob_in_var() {
        let (_backend, session) = connect();
        let mut lob = session.new_temp_lob(OracleType::Clob).unwrap();
        lob.write("déjà vu".as_bytes()).unwrap();

        let var = session
            .new_var(VarSpec::new(OracleType::Clob, NativeType::Lob).with_array_size(2))
            .unwrap();
        var.set(0, &lob.clone().into()).unwrap();

        let value = var.get(0).unwrap();
        assert_eq!(value, NativeValue::Lob(lob));
        let mut fetched = value.as_lob().unwrap().clone();
        assert_eq!(fetched.position(), 0);
        assert_eq!(&fetched.read(None).unwrap().unwrap()[..], "déjà vu".as_bytes());
        assert_eq!(var.get(1).unwrap(), NativeValue::Null);
    }
}
