use std::fs;

use blobfs::{BlobFS, DirBucket, MapBucket};

fn main() {
    // in-memory bucket: keys are flat, `docs/` exists only as a prefix
    let mut bucket = MapBucket::new();
    bucket.put("docs/first.txt", b"Hello").unwrap();
    bucket.put("second.txt", b"World").unwrap();

    let fs = BlobFS::new(bucket);
    assert!(fs.is_dir("docs").unwrap());

    let first_content = fs.read_file("docs/first.txt").unwrap();
    let second_content = fs.read_file("second.txt").unwrap();

    println!(
        "{}, {}!",
        String::from_utf8(first_content).unwrap(),
        String::from_utf8(second_content).unwrap()
    );

    // the same view over a host directory
    let root = std::env::temp_dir().join("blobfs_hello");
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::write(root.join("docs/first.txt"), b"Hello").unwrap();

    let fs = BlobFS::new(DirBucket::new(&root).unwrap());
    for entry in fs.tree(".").unwrap() {
        println!("{:o} {:>6} {}", entry.mode(), entry.size(), entry.path());
    }

    fs::remove_dir_all(&root).unwrap();
}
