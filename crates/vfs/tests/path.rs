use vfs::{FsError, PathComponent, UnixPath, parse_path};

#[test]
fn test_parse_path_components() {
    assert_eq!(
        parse_path("/a/./../b"),
        [
            PathComponent::Root,
            PathComponent::Normal("a"),
            PathComponent::Current,
            PathComponent::Parent,
            PathComponent::Normal("b"),
        ]
    );
    assert!(parse_path("").is_empty());
}

#[test]
fn test_unix_path_normalizes() {
    assert_eq!(UnixPath::parse("/foo/bar").unwrap().as_str(), "/foo/bar");
    assert_eq!(UnixPath::parse("///foo///bar///").unwrap().as_str(), "/foo/bar");
    assert_eq!(UnixPath::parse("/foo/./bar/..").unwrap().as_str(), "/foo");
    assert_eq!(UnixPath::parse("/../..").unwrap().as_str(), "/");
    assert!(UnixPath::parse("/").unwrap().is_root());
}

#[test]
fn test_unix_path_rejects_relative() {
    assert_eq!(UnixPath::parse("foo/bar"), Err(FsError::InvalidArgument));
    assert_eq!(UnixPath::parse(""), Err(FsError::InvalidArgument));
}

#[test]
fn test_unix_path_segment_too_long() {
    let long = format!("/{}", "x".repeat(256));
    assert_eq!(UnixPath::parse(&long), Err(FsError::NameTooLong));
}

#[test]
fn test_parent_and_file_name() {
    let p = UnixPath::parse("/dev/keyboard").unwrap();
    assert_eq!(p.file_name(), Some("keyboard"));
    assert_eq!(p.parent().unwrap().as_str(), "/dev");
    assert_eq!(p.parent().unwrap().parent().unwrap().as_str(), "/");
    assert_eq!(UnixPath::root().parent(), None);
    assert_eq!(UnixPath::root().file_name(), None);
    assert!(UnixPath::root().split().is_err());
}

#[test]
fn test_snap_tail() {
    let p = UnixPath::parse("/a/b/c").unwrap();
    assert_eq!(p.snap_tail(1).as_str(), "/a/b");
    assert_eq!(p.snap_tail(3).as_str(), "/");
    assert_eq!(p.snap_tail(9).as_str(), "/");
    assert_eq!(p.depth(), 3);
}

#[test]
fn test_join_and_prefix() {
    let dev = UnixPath::parse("/dev").unwrap();
    let kbd = dev.join("keyboard").unwrap();
    assert_eq!(kbd.as_str(), "/dev/keyboard");
    assert_eq!(UnixPath::root().join("dev").unwrap(), dev);
    assert_eq!(dev.join("a/b"), Err(FsError::InvalidArgument));
    assert_eq!(dev.join(".."), Err(FsError::InvalidArgument));

    assert!(kbd.starts_with(&dev));
    assert!(kbd.starts_with(&UnixPath::root()));
    assert!(!UnixPath::parse("/devices").unwrap().starts_with(&dev));
    let rest: Vec<&str> = kbd.strip_prefix(&UnixPath::root()).unwrap().collect();
    assert_eq!(rest, ["dev", "keyboard"]);
}
