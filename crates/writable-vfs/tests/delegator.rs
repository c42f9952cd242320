#![allow(unused_crate_dependencies, reason = "These are tests, not the main crate.")]

use std::sync::Arc;
use std::collections::BTreeMap;

use parking_lot::Mutex;

use writable_vfs::{Cause, FileMode, MemoryFs, Op, PathError};
use writable_vfs::delegator::{
    DirEntryDelegator, FileDelegator, FileInfoDelegator, FsDelegator, OpenFsDelegator,
};
use writable_vfs::traits::{DirEntry, File, FileInfo, Fs, WriterFile};


const PERM: FileMode = FileMode::PERM;

type CreateResult = writable_vfs::Result<Box<dyn WriterFile>>;

fn source() -> MemoryFs {
    let fsys = MemoryFs::new();
    fsys.write_file("dir0/file01.txt", b"content01\n", PERM).unwrap();
    fsys.write_file("dir0/file02.txt", b"content02\n", PERM).unwrap();
    fsys.write_file("dir0/sub/file03.txt", b"content03\n", PERM).unwrap();
    fsys
}

fn injected(op: Op, name: &str) -> writable_vfs::Error {
    PathError::new(op, name, Cause::Io(std::io::Error::other("injected"))).into()
}


#[cfg(feature = "fstest")]
#[test]
fn delegators_pass_conformance() {
    let open_only = OpenFsDelegator::delegate(source());
    writable_vfs::fstest::check_fs(&open_only, &["dir0/sub/file03.txt"]).unwrap();

    let full = FsDelegator::delegate(Arc::new(source()));
    writable_vfs::fstest::check_fs(&full, &["dir0/sub/file03.txt"]).unwrap();
    writable_vfs::fstest::check_write_file_fs(&full, "tmp").unwrap();
}

#[test]
fn copy_captures_writes() {
    let captured: Arc<Mutex<BTreeMap<String, Vec<u8>>>> = Arc::default();

    let mut dest = FsDelegator::delegate(Arc::new(MemoryFs::new()));
    dest.create_file = Some(Box::new({
        let captured = Arc::clone(&captured);
        move |name: &str, _mode: FileMode| -> CreateResult {
            let captured = Arc::clone(&captured);
            let name = name.to_owned();
            Ok(Box::new(FileDelegator {
                write: Some(Box::new(move |buf: &[u8]| -> std::io::Result<usize> {
                    captured.lock().entry(name.clone()).or_default().extend_from_slice(buf);
                    Ok(buf.len())
                })),
                ..FileDelegator::default()
            }))
        }
    }));

    writable_vfs::copy_fs(&dest, &source(), "dir0").unwrap();

    let captured = captured.lock();
    let expected = BTreeMap::from([
        ("dir0/file01.txt".to_owned(), b"content01\n".to_vec()),
        ("dir0/file02.txt".to_owned(), b"content02\n".to_vec()),
        ("dir0/sub/file03.txt".to_owned(), b"content03\n".to_vec()),
    ]);
    assert_eq!(*captured, expected);
}

#[test]
fn copy_stops_on_stat_error() {
    let mut src = FsDelegator::delegate(Arc::new(source()));
    src.stat = Some(Box::new(|name: &str| -> writable_vfs::Result<Box<dyn FileInfo>> {
        Err(injected(Op::Stat, name))
    }));

    let err = writable_vfs::copy_fs(&FsDelegator::default(), &src, ".").unwrap_err();
    assert_eq!(err.to_string(), "Stat .: injected");
}

#[test]
fn copy_stops_on_open_error() {
    let mut src = FsDelegator::delegate(Arc::new(source()));
    src.open = Some(Box::new(|name: &str| -> writable_vfs::Result<Box<dyn File>> {
        Err(injected(Op::Open, name))
    }));

    let err = writable_vfs::copy_fs(&FsDelegator::default(), &src, ".").unwrap_err();
    assert_eq!(err.to_string(), "Open dir0/file01.txt: injected");
}

#[test]
fn copy_stops_on_create_error() {
    let dest = FsDelegator {
        create_file: Some(Box::new(|name: &str, _mode: FileMode| -> CreateResult {
            Err(injected(Op::CreateFile, name))
        })),
        ..FsDelegator::default()
    };

    let err = writable_vfs::copy_fs(&dest, &source(), ".").unwrap_err();
    assert_eq!(err.to_string(), "CreateFile dir0/file01.txt: injected");
}

#[test]
fn copy_reports_close_error() {
    let mut dest = FsDelegator::delegate(Arc::new(MemoryFs::new()));
    dest.create_file = Some(Box::new(|name: &str, _mode: FileMode| -> CreateResult {
        let name = name.to_owned();
        Ok(Box::new(FileDelegator {
            write: Some(Box::new(|buf: &[u8]| -> std::io::Result<usize> { Ok(buf.len()) })),
            close: Some(Box::new(move || -> writable_vfs::Result<()> {
                Err(injected(Op::Write, &name))
            })),
            ..FileDelegator::default()
        }))
    }));

    let err = writable_vfs::copy_fs(&dest, &source(), "dir0/sub").unwrap_err();
    assert_eq!(err.to_string(), "Write dir0/sub/file03.txt: injected");
}

#[test]
fn delegate_reads() {
    let fsys = FsDelegator::delegate(Arc::new(source()));

    let names = fsys.read_dir("dir0")
        .unwrap()
        .iter()
        .map(|entry| entry.name().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(names, ["file01.txt", "file02.txt", "sub"]);

    assert_eq!(fsys.read_file("dir0/file02.txt").unwrap(), b"content02\n");
    assert_eq!(fsys.glob("dir0/*/*.txt").unwrap(), ["dir0/sub/file03.txt"]);
    assert!(fsys.stat("dir0/sub").unwrap().is_dir());

    let sub = fsys.sub("dir0").unwrap();
    assert_eq!(sub.read_file("sub/file03.txt").unwrap(), b"content03\n");
}

#[test]
fn delegate_file() {
    let fsys = source();
    let mut file = FileDelegator::delegate(Fs::open(&fsys, "dir0").unwrap());

    assert!(file.stat().unwrap().is_dir());
    let first = file.read_dir(2).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(file.read_dir(2).unwrap().len(), 1);
    assert!(file.read_dir(2).unwrap_err().is_eof());
    file.close().unwrap();
}

#[test]
fn open_fs_delegator_hides_capabilities() {
    let fsys = OpenFsDelegator::delegate(source());

    assert!(writable_vfs::capabilities(&fsys).read_only());
    assert_eq!(
        writable_vfs::remove_all(&fsys, "dir0").unwrap_err().to_string(),
        "RemoveAll dir0: not implemented",
    );
    assert_eq!(fsys.read_file("dir0/file01.txt").unwrap(), b"content01\n");
    assert_eq!(fsys.glob("*/*1.txt").unwrap(), ["dir0/file01.txt"]);
}

#[test]
fn entry_and_info_delegators() {
    let fsys = source();
    let entries = Fs::read_dir(&fsys, "dir0").unwrap();

    let delegated = entries
        .into_iter()
        .map(DirEntryDelegator::delegate)
        .collect::<Vec<_>>();
    assert_eq!(delegated[2].name(), "sub");
    assert!(delegated[2].is_dir());
    assert_eq!(delegated[2].file_type(), FileMode::DIR);

    let info = FileInfoDelegator::from_info(delegated[0].info().unwrap().as_ref());
    assert_eq!(info.name, "file01.txt");
    assert_eq!(info.size, 10);
    assert!(!info.is_dir);
    assert_eq!(info.mod_time(), fsys.stat("dir0/file01.txt").unwrap().mod_time());
}
