use std::sync::Arc;

use device::{BlockDriver, RamDisk};
use fs::fat32::{
    CLUSTER_UNUSED, Fat32Entry, Fat32Volume, FatNode, FormatOptions, format,
};
use test_support::init_arch_ops;
use vfs::{FsEntry, FsError, NamespaceConfig, RamDirectory, UnixPath, VfsNamespace, VfsNode};

/// 8192 扇区、每簇 8 扇区：每簇 128 个目录槽
fn volume_with_sectors(sectors: usize) -> (Arc<RamDisk>, Arc<Fat32Volume>) {
    init_arch_ops();
    let disk = RamDisk::new(sectors * 512, 512, 0);
    format(&*disk, 0, 0, &FormatOptions::default()).unwrap();
    let device: Arc<dyn BlockDriver> = disk.clone();
    let volume = Fat32Volume::open(device, 0, 0).unwrap();
    (disk, volume)
}

fn volume() -> (Arc<RamDisk>, Arc<Fat32Volume>) {
    volume_with_sectors(8192)
}

fn p(path: &str) -> UnixPath {
    UnixPath::parse(path).unwrap()
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn write_all(volume: &Fat32Volume, path: &str, data: &[u8]) -> Fat32Entry {
    let mut entry = volume.get_entry(&p(path)).unwrap();
    assert_eq!(volume.write_file(&mut entry, 0, data).unwrap(), data.len());
    entry
}

fn read_all(volume: &Fat32Volume, path: &str) -> Vec<u8> {
    let mut entry = volume.get_entry(&p(path)).unwrap();
    let mut buf = vec![0u8; entry.size as usize + 16];
    let n = volume.read_file(&mut entry, 0, &mut buf).unwrap();
    buf.truncate(n);
    buf
}

#[test]
fn test_fresh_volume() {
    let (_disk, volume) = volume();
    assert_eq!(volume.label(), "NO NAME");
    assert_eq!(volume.fat_type(), "FAT32");
    assert_eq!(volume.cluster_size(), 4096);
    assert_eq!(volume.used_space_in_clusters().unwrap(), 1);
    assert_eq!(volume.geometry().slots_per_cluster(), 128);
    assert_eq!(volume.read_dir(&volume.root_entry()).unwrap().count(), 0);
}

#[test]
fn test_create_then_get() {
    let (_disk, volume) = volume();
    volume.create_entry(&p("/readme.txt"), false).unwrap();
    volume.create_entry(&p("/docs"), true).unwrap();

    let file = volume.get_entry(&p("/README.TXT")).unwrap();
    assert_eq!(file.name.display(), "README.TXT");
    assert!(!file.is_directory());
    assert_eq!(file.size, 0);
    assert_eq!(file.data_cluster, CLUSTER_UNUSED);

    let dir = volume.get_entry(&p("/Docs")).unwrap();
    assert!(dir.is_directory());
    assert_eq!(volume.used_space_in_clusters().unwrap(), 1);
}

#[test]
fn test_create_rejects_bad_names_and_duplicates() {
    let (_disk, volume) = volume();
    volume.create_entry(&p("/a.txt"), false).unwrap();
    assert_eq!(volume.create_entry(&p("/A.TXT"), false), Err(FsError::AlreadyExists));
    assert_eq!(
        volume.create_entry(&p("/longfilename.txt"), false),
        Err(FsError::NameTooLong)
    );
    assert_eq!(volume.create_entry(&p("/a b"), false), Err(FsError::InvalidArgument));
    assert_eq!(volume.create_entry(&UnixPath::root(), true), Err(FsError::InvalidArgument));
    assert_eq!(volume.create_entry(&p("/none/x"), false), Err(FsError::NotFound));
}

#[test]
fn test_write_then_read() {
    let (_disk, volume) = volume();
    volume.create_entry(&p("/data.bin"), false).unwrap();
    let data = pattern(10_000);
    let entry = write_all(&volume, "/data.bin", &data);
    assert_eq!(entry.size, 10_000);
    assert_eq!(read_all(&volume, "/data.bin"), data);
    // 根目录 1 簇 + 文件 3 簇
    assert_eq!(volume.used_space_in_clusters().unwrap(), 4);

    let mut entry = volume.get_entry(&p("/data.bin")).unwrap();
    volume.write_file(&mut entry, 4090, &[0xAA; 20]).unwrap();
    assert_eq!(entry.size, 10_000);
    let mut buf = [0u8; 24];
    assert_eq!(volume.read_file(&mut entry, 4088, &mut buf).unwrap(), 24);
    assert_eq!(&buf[..2], &data[4088..4090]);
    assert!(buf[2..22].iter().all(|&b| b == 0xAA));
    assert_eq!(&buf[22..], &data[4110..4112]);

    assert_eq!(
        volume.write_file(&mut entry, 10_001, b"x"),
        Err(FsError::InvalidArgument)
    );
    assert_eq!(volume.read_file(&mut entry, 10_000, &mut buf).unwrap(), 0);
}

#[test]
fn test_append_at_end_extends_chain() {
    let (_disk, volume) = volume();
    volume.create_entry(&p("/log"), false).unwrap();
    let mut entry = volume.get_entry(&p("/log")).unwrap();
    for chunk in 0..5u8 {
        let at = entry.size as u64;
        volume.write_file(&mut entry, at, &[chunk; 1000]).unwrap();
    }
    assert_eq!(entry.size, 5000);
    assert_eq!(volume.used_space_in_clusters().unwrap(), 3);
    let data = read_all(&volume, "/log");
    assert_eq!(data[999], 0);
    assert_eq!(data[1000], 1);
    assert_eq!(data[4999], 4);
}

#[test]
fn test_delete_file_frees_its_chain() {
    let (_disk, volume) = volume();
    volume.create_entry(&p("/keep"), false).unwrap();
    volume.create_entry(&p("/big"), false).unwrap();
    write_all(&volume, "/big", &pattern(3 * 4096));
    assert_eq!(volume.used_space_in_clusters().unwrap(), 4);

    volume.delete_entry(&p("/big")).unwrap();
    assert_eq!(volume.used_space_in_clusters().unwrap(), 1);
    assert_eq!(volume.get_entry(&p("/big")), Err(FsError::NotFound));
    assert!(volume.get_entry(&p("/keep")).is_ok());
}

#[test]
fn test_delete_directory() {
    let (_disk, volume) = volume();
    volume.create_entry(&p("/d"), true).unwrap();
    volume.create_entry(&p("/d/f"), false).unwrap();
    assert_eq!(volume.used_space_in_clusters().unwrap(), 2);
    assert_eq!(volume.delete_entry(&p("/d")), Err(FsError::DirectoryNotEmpty));

    // 目录唯一的簇被清空后摘下
    volume.delete_entry(&p("/d/f")).unwrap();
    assert_eq!(volume.used_space_in_clusters().unwrap(), 1);
    assert_eq!(volume.get_entry(&p("/d")).unwrap().data_cluster, CLUSTER_UNUSED);

    volume.delete_entry(&p("/d")).unwrap();
    assert_eq!(volume.used_space_in_clusters().unwrap(), 1);
    assert_eq!(volume.delete_entry(&UnixPath::root()), Err(FsError::InvalidArgument));
}

#[test]
fn test_emptied_root_keeps_its_cluster() {
    let (_disk, volume) = volume();
    volume.create_entry(&p("/only"), false).unwrap();
    volume.delete_entry(&p("/only")).unwrap();
    assert_eq!(volume.used_space_in_clusters().unwrap(), 1);
    volume.create_entry(&p("/again"), false).unwrap();
    let entry = volume.get_entry(&p("/again")).unwrap();
    assert_eq!(entry.slot.unwrap().cluster, volume.root_entry().data_cluster);
}

#[test]
fn test_slot_reuse_after_delete() {
    let (_disk, volume) = volume();
    for name in ["/a", "/b", "/c"] {
        volume.create_entry(&p(name), false).unwrap();
    }
    let a = volume.get_entry(&p("/a")).unwrap().slot.unwrap();
    let c = volume.get_entry(&p("/c")).unwrap().slot.unwrap();

    // 末尾的槽变为目录结束，随后的新建落在同一位置
    volume.delete_entry(&p("/c")).unwrap();
    volume.create_entry(&p("/d"), false).unwrap();
    assert_eq!(volume.get_entry(&p("/d")).unwrap().slot, Some(c));

    // 后面仍有条目的槽变为已删除，优先复用
    volume.delete_entry(&p("/a")).unwrap();
    volume.create_entry(&p("/e"), false).unwrap();
    assert_eq!(volume.get_entry(&p("/e")).unwrap().slot, Some(a));

    let names: Vec<String> = volume
        .read_dir(&volume.root_entry())
        .unwrap()
        .map(|e| e.unwrap().name.display())
        .collect();
    assert_eq!(names, ["E", "B", "D"]);
}

#[test]
fn test_full_cluster_appends_and_reuses() {
    let (_disk, volume) = volume();
    for i in 0..128 {
        volume.create_entry(&p(&format!("/f{}", i)), false).unwrap();
    }
    assert_eq!(volume.used_space_in_clusters().unwrap(), 1);

    volume.create_entry(&p("/f128"), false).unwrap();
    assert_eq!(volume.used_space_in_clusters().unwrap(), 2);
    let overflow = volume.get_entry(&p("/f128")).unwrap().slot.unwrap();
    assert_ne!(overflow.cluster, volume.root_entry().data_cluster);
    assert_eq!((overflow.sector, overflow.index), (0, 0));

    let victim = volume.get_entry(&p("/f64")).unwrap().slot.unwrap();
    volume.delete_entry(&p("/f64")).unwrap();
    volume.create_entry(&p("/new"), false).unwrap();
    assert_eq!(volume.get_entry(&p("/new")).unwrap().slot, Some(victim));
    assert_eq!(volume.read_dir(&volume.root_entry()).unwrap().count(), 129);
    assert_eq!(volume.used_space_in_clusters().unwrap(), 2);
}

#[test]
fn test_emptied_tail_cluster_is_detached() {
    let (_disk, volume) = volume();
    for i in 0..129 {
        volume.create_entry(&p(&format!("/f{}", i)), false).unwrap();
    }
    assert_eq!(volume.used_space_in_clusters().unwrap(), 2);
    volume.delete_entry(&p("/f128")).unwrap();
    assert_eq!(volume.used_space_in_clusters().unwrap(), 1);
    volume.create_entry(&p("/f128"), false).unwrap();
    assert_eq!(volume.used_space_in_clusters().unwrap(), 2);
}

#[test]
fn test_read_dir_is_lazy_and_finite() {
    let (_disk, volume) = volume();
    volume.create_entry(&p("/dir"), true).unwrap();
    for i in 0..200 {
        volume.create_entry(&p(&format!("/dir/e{}", i)), false).unwrap();
    }
    let dir = volume.get_entry(&p("/dir")).unwrap();
    let first: Vec<String> = volume
        .read_dir(&dir)
        .unwrap()
        .take(2)
        .map(|e| e.unwrap().name.display())
        .collect();
    assert_eq!(first, ["E0", "E1"]);
    assert_eq!(volume.read_dir(&dir).unwrap().count(), 200);

    let mut visited = 0;
    volume
        .enumerate_directory(&dir, |_| {
            visited += 1;
            visited < 130
        })
        .unwrap();
    assert_eq!(visited, 130);

    let file = volume.create_entry(&p("/plain"), false).unwrap();
    assert!(matches!(volume.read_dir(&file), Err(FsError::NotDirectory)));
}

#[test]
fn test_not_directory() {
    let (_disk, volume) = volume();
    volume.create_entry(&p("/a"), true).unwrap();
    volume.create_entry(&p("/a/b"), false).unwrap();
    assert_eq!(volume.get_entry(&p("/a/b/c")), Err(FsError::NotDirectory));
    assert_eq!(volume.create_entry(&p("/a/b/c"), false), Err(FsError::NotDirectory));
    assert_eq!(volume.get_entry(&p("/a/x/c")), Err(FsError::NotFound));
}

#[test]
fn test_move_entry() {
    let (_disk, volume) = volume();
    volume.create_entry(&p("/d"), true).unwrap();
    volume.create_entry(&p("/f"), false).unwrap();
    let data = pattern(5000);
    write_all(&volume, "/f", &data);
    let used = volume.used_space_in_clusters().unwrap();

    volume.move_entry(&p("/f"), &p("/d/g")).unwrap();
    assert_eq!(volume.get_entry(&p("/f")), Err(FsError::NotFound));
    assert_eq!(read_all(&volume, "/d/g"), data);
    // 数据簇不动，只多了 /d 的目录簇
    assert_eq!(volume.used_space_in_clusters().unwrap(), used + 1);

    volume.create_entry(&p("/other"), false).unwrap();
    assert_eq!(
        volume.move_entry(&p("/other"), &p("/d/g")),
        Err(FsError::AlreadyExists)
    );
    assert_eq!(
        volume.move_entry(&p("/d"), &p("/d/inner")),
        Err(FsError::InvalidArgument)
    );
    assert_eq!(
        volume.move_entry(&p("/missing"), &p("/x")),
        Err(FsError::NotFound)
    );

    volume.move_entry(&p("/d"), &p("/renamed")).unwrap();
    assert_eq!(read_all(&volume, "/renamed/g"), data);
}

#[test]
fn test_move_directory_into_itself_ignores_case() {
    let (_disk, volume) = volume();
    volume.create_entry(&p("/d"), true).unwrap();
    volume.create_entry(&p("/d/sub"), true).unwrap();
    volume.create_entry(&p("/d/f"), false).unwrap();
    let used = volume.used_space_in_clusters().unwrap();

    assert_eq!(
        volume.move_entry(&p("/d"), &p("/D/inner")),
        Err(FsError::InvalidArgument)
    );
    assert_eq!(
        volume.move_entry(&p("/d"), &p("/D/SUB/inner")),
        Err(FsError::InvalidArgument)
    );
    assert!(volume.get_entry(&p("/d/f")).is_ok());
    assert!(volume.get_entry(&p("/d/inner")).is_err());
    assert_eq!(volume.used_space_in_clusters().unwrap(), used);

    // 名字相近的兄弟目录不受影响
    volume.create_entry(&p("/dd"), true).unwrap();
    volume.move_entry(&p("/d"), &p("/DD/inner")).unwrap();
    assert!(volume.get_entry(&p("/dd/inner/f")).is_ok());
}

#[test]
fn test_truncate() {
    let (_disk, volume) = volume();
    volume.create_entry(&p("/t"), false).unwrap();
    let mut entry = write_all(&volume, "/t", &pattern(10_000));
    assert_eq!(volume.used_space_in_clusters().unwrap(), 4);

    volume.truncate_file(&mut entry, 100).unwrap();
    assert_eq!(entry.size, 100);
    assert_eq!(volume.used_space_in_clusters().unwrap(), 2);

    volume.truncate_file(&mut entry, 5000).unwrap();
    let data = read_all(&volume, "/t");
    assert_eq!(data.len(), 5000);
    assert_eq!(&data[..100], &pattern(100)[..]);
    assert!(data[100..].iter().all(|&b| b == 0));
    assert_eq!(volume.used_space_in_clusters().unwrap(), 3);

    volume.truncate_file(&mut entry, 0).unwrap();
    assert_eq!(entry.data_cluster, CLUSTER_UNUSED);
    assert_eq!(volume.used_space_in_clusters().unwrap(), 1);
}

#[test]
fn test_allocation_failure_leaves_volume_unchanged() {
    // 2048 扇区：251 个数据簇，根目录占 1 个
    let (_disk, volume) = volume_with_sectors(2048);
    volume.create_entry(&p("/d"), true).unwrap();
    volume.create_entry(&p("/big"), false).unwrap();
    volume.create_entry(&p("/fill"), false).unwrap();

    let mut big = volume.get_entry(&p("/big")).unwrap();
    assert_eq!(
        volume.write_file(&mut big, 0, &vec![1u8; 2_000_000]),
        Err(FsError::NoSpace)
    );
    assert_eq!(volume.used_space_in_clusters().unwrap(), 1);
    assert_eq!(volume.get_entry(&p("/big")).unwrap().size, 0);

    write_all(&volume, "/fill", &vec![2u8; 250 * 4096]);
    assert_eq!(volume.used_space_in_clusters().unwrap(), 251);

    assert_eq!(volume.create_entry(&p("/d/x"), false), Err(FsError::NoSpace));
    assert_eq!(volume.used_space_in_clusters().unwrap(), 251);
    assert_eq!(volume.get_entry(&p("/d")).unwrap().data_cluster, CLUSTER_UNUSED);
    assert_eq!(volume.get_entry(&p("/d/x")), Err(FsError::NotFound));
}

#[test]
fn test_device_failure_surfaces_as_io_error() {
    let (disk, volume) = volume();
    disk.set_fail_writes(true);
    assert_eq!(volume.create_entry(&p("/x"), false), Err(FsError::IoError));
    disk.set_fail_writes(false);
    assert_eq!(volume.get_entry(&p("/x")), Err(FsError::NotFound));
}

#[test]
fn test_open_rejects_garbage() {
    init_arch_ops();
    let disk = RamDisk::new(64 * 512, 512, 0);
    let device: Arc<dyn BlockDriver> = disk;
    assert!(matches!(
        Fat32Volume::open(device, 0, 0),
        Err(FsError::InvalidArgument)
    ));
}

// ========== 通过命名空间访问 ==========

fn mounted() -> (Arc<Fat32Volume>, VfsNamespace) {
    let (_disk, volume) = volume();
    let root = RamDirectory::new("/");
    let ns = VfsNamespace::new(root, NamespaceConfig::default()).unwrap();
    ns.attach(FatNode::root(volume.clone(), "HDD0"), "/").unwrap();
    (volume, ns)
}

#[test]
fn test_namespace_file_io() {
    let (volume, ns) = mounted();
    ns.create_entry("/HDD0/notes.txt", false).unwrap();

    let fd = ns.open("/HDD0/notes.txt").unwrap();
    assert_eq!(ns.write(fd, b"hello fat").unwrap(), 9);
    ns.seek(fd, 0).unwrap();
    let mut buf = [0u8; 32];
    assert_eq!(ns.read(fd, &mut buf).unwrap(), 9);
    assert_eq!(&buf[..9], b"hello fat");
    assert_eq!(ns.seek(fd, 10), Err(FsError::InvalidArgument));
    ns.truncate(fd, 5).unwrap();
    assert_eq!(ns.tell(fd).unwrap(), 5);
    ns.close(fd).unwrap();

    assert_eq!(volume.get_entry(&p("/NOTES.TXT")).unwrap().size, 5);
    // 大小写不同的路径落到同一缓存项
    let a = ns.open("/HDD0/notes.txt").unwrap();
    let b = ns.open("/HDD0/NOTES.TXT").unwrap();
    assert_eq!(a, b);
    assert_eq!(ns.refcount("/HDD0/NOTES.TXT"), Some(2));
}

#[test]
fn test_namespace_enumerate_and_delete() {
    let (_volume, ns) = mounted();
    ns.create_entry("/HDD0/dir", true).unwrap();
    ns.create_entry("/HDD0/dir/one", false).unwrap();
    ns.create_entry("/HDD0/dir/two", false).unwrap();

    let fd = ns.open("/HDD0/dir").unwrap();
    let mut out = vec![FsEntry::empty(); 8];
    assert_eq!(ns.enumerate(fd, &mut out).unwrap(), 2);
    assert_eq!(out[0].name_str(), Some("ONE"));
    assert!(!out[1].is_directory);
    ns.close(fd).unwrap();

    let file = ns.open("/HDD0/dir/one").unwrap();
    assert_eq!(ns.delete_entry("/HDD0/dir/one"), Err(FsError::Busy));
    ns.close(file).unwrap();
    ns.delete_entry("/HDD0/dir/one").unwrap();
    assert!(!ns.exists("/HDD0/dir/one"));
    assert_eq!(
        ns.open("/HDD0/dir/two/three"),
        Err(FsError::NotDirectory)
    );
}

#[test]
fn test_namespace_move_within_volume() {
    let (_volume, ns) = mounted();
    ns.create_entry("/HDD0/a", true).unwrap();
    ns.create_entry("/HDD0/f", false).unwrap();
    ns.move_entry("/HDD0/f", "/HDD0/a/g").unwrap();
    assert!(ns.exists("/HDD0/a/g"));
    assert!(!ns.exists("/HDD0/f"));

    let dev = RamDirectory::new("dev");
    ns.attach(dev, "/").unwrap();
    assert_eq!(
        ns.move_entry("/HDD0/a/g", "/dev/g"),
        Err(FsError::NotSupported)
    );
}

#[test]
fn test_namespace_move_into_own_subtree_by_other_case() {
    let (_volume, ns) = mounted();
    ns.create_entry("/HDD0/d", true).unwrap();
    ns.create_entry("/HDD0/d/f", false).unwrap();
    assert_eq!(
        ns.move_entry("/HDD0/d", "/HDD0/D/inner"),
        Err(FsError::InvalidArgument)
    );
    assert!(ns.exists("/HDD0/D/F"));
    assert!(!ns.exists("/HDD0/D/INNER"));
}

#[test]
fn test_fat_node_names() {
    let (volume, _ns) = mounted();
    volume.create_entry(&p("/mixed.txt"), false).unwrap();
    let root = FatNode::root(volume, "HDD0");
    let child = root.lookup("Mixed.Txt").unwrap();
    assert_eq!(child.name(), "MIXED.TXT");
    assert!(child.matches_name("mixed.txt"));
    assert!(root.matches_name("HDD0"));
    assert!(!root.matches_name("hdd0"));
}
