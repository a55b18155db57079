/* Copyright (c) [2025] [Syswonder Community]
 *   [Dcfs] is licensed under Mulan PSL v2.
 *   You can use this software according to the terms and conditions of the Mulan PSL v2.
 *   You may obtain a copy of Mulan PSL v2 at:
 *               http://license.coscl.org.cn/MulanPSL2
 *   THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
 *   See the Mulan PSL v2 for more details.
 */

use std::borrow::Cow;
use std::sync::Arc;

use driver_flash::ramflash::RamFlash;
use driver_gdrom::imagedrive::ImageDrive;
use driver_gdrom::{disc, status, GdromDriverOps};
use rand::Rng;

use crate::fops::OpenOptions;
use crate::gdrom::GdromBackend;
use crate::monitor::DiscMonitor;
use crate::{init_rootfs, Session, Vfs, VfsError, VfsNodeType};

const ROM_SIZE: usize = 2 * 1024 * 1024;
const FLASH_SIZE: usize = 0x20000;
const TRACK1_SECTORS: usize = 10;

fn pattern(len: usize, seed: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 7 + seed) % 251) as u8).collect()
}

fn read_only() -> OpenOptions {
    let mut opts = OpenOptions::new();
    opts.read(true);
    opts
}

struct TestBed {
    vfs: Arc<Vfs>,
    drive: ImageDrive,
    backend: Arc<GdromBackend>,
    monitor: Arc<DiscMonitor>,
    rom: Vec<u8>,
    flash: Vec<u8>,
    track1: Vec<u8>,
    track2: Vec<u8>,
}

impl TestBed {
    fn new() -> Self {
        let rom = pattern(ROM_SIZE, 1);
        let flash = pattern(FLASH_SIZE, 2);
        let mut flash_dev = RamFlash::new(flash.clone());
        flash_dev.add_partition(0, 0x0000, 0x2000);
        flash_dev.add_partition(2, 0x2000, 0x1000);
        flash_dev.add_partition(5, 0x8000, 0x4000);

        let vfs = init_rootfs(Cow::Owned(rom.clone()), Box::new(flash_dev)).unwrap();

        let drive = ImageDrive::new();
        let track1 = pattern(TRACK1_SECTORS * 2048, 3);
        let track2 = pattern(2 * 2352, 4);
        drive.add_data_track(0, 1, 150, track1.clone());
        drive.add_audio_track(0, 2, 150 + TRACK1_SECTORS as u32, track2.clone());
        drive.add_data_track(1, 3, 45150, pattern(4 * 2048, 5));
        drive.set_disc_type(disc::GDROM);

        let backend = GdromBackend::new(vfs.clone(), Box::new(drive.clone()));
        let monitor = DiscMonitor::new(backend.clone());
        Self {
            vfs,
            drive,
            backend,
            monitor,
            rom,
            flash,
            track1,
            track2,
        }
    }

    fn session(&self) -> Session {
        self.vfs.open_session()
    }

    /// Drives the monitor by hand: flip the drive state, then poll and
    /// deliver like the ticker/worker pair would.
    fn deliver_state(&self, state: u32) {
        self.drive.set_status(state);
        if let Some(state) = self.monitor.poll() {
            self.monitor.handle_state(state);
        }
    }

    fn insert_disc(&self) {
        self.deliver_state(status::PAUSED);
        assert!(self.backend.is_mounted());
    }
}

fn list_names(session: &Session, path: &str) -> Vec<String> {
    let mut dir = session.opendir(path).unwrap();
    let mut names = Vec::new();
    while let Some(entry) = dir.read_entry().unwrap() {
        names.push(entry.name().to_string());
    }
    names
}

#[test]
fn rom_slice() {
    let bed = TestBed::new();
    let session = bed.session();
    let mut file = session.open("/rom", &read_only()).unwrap();
    let mut buf = [0u8; 16];
    let n = file.read_elems(&mut buf, 1, 16).unwrap();
    assert_eq!(n, 16);
    assert_eq!(&buf, &bed.rom[..16]);
    assert_eq!(file.position(), 16);
    assert!(!file.eof());
}

#[test]
fn path_normalization_against_cwd() {
    let bed = TestBed::new();
    let session = bed.session();
    session.chdir("/flash").unwrap();
    assert_eq!(session.current_dir().as_str(), "/flash");

    let attr = session.stat("../rom").unwrap();
    assert!(!attr.is_dir());
    assert_eq!(attr.size(), 2097152);

    let direct = session.stat("/rom").unwrap();
    assert_eq!(direct.size(), attr.size());
    assert_eq!(direct.file_type(), attr.file_type());

    // Relative lookups resolve against the cwd.
    let part = session.stat("partition0").unwrap();
    assert_eq!(part.size(), 0x2000);
}

#[test]
fn root_listing_follows_mount_order() {
    let bed = TestBed::new();
    let session = bed.session();
    assert_eq!(list_names(&session, "/"), ["rom", "flash"]);

    bed.insert_disc();
    assert_eq!(list_names(&session, "/"), ["rom", "flash", "gdrom"]);
    assert_eq!(
        list_names(&session, "/gdrom/session1"),
        ["toc", "track01.iso", "track02.cdda"]
    );
    assert_eq!(list_names(&session, "/gdrom/session2"), ["toc", "track03.iso"]);
}

#[test]
fn flash_enumeration_keeps_probe_order() {
    let bed = TestBed::new();
    let session = bed.session();
    assert_eq!(
        list_names(&session, "/flash"),
        ["partition0", "partition2", "partition5"]
    );
    let attr = session.stat("/flash/partition5").unwrap();
    assert_eq!(attr.size(), 0x4000);
}

#[test]
fn flash_reads_come_from_the_partition_window() {
    let bed = TestBed::new();
    let session = bed.session();
    let mut file = session.open("/flash/partition2", &read_only()).unwrap();
    let mut buf = vec![0u8; 0x1000];
    assert_eq!(file.read(&mut buf).unwrap(), 0x1000);
    assert_eq!(&buf, &bed.flash[0x2000..0x3000]);
    assert!(file.eof());
    assert_eq!(file.read(&mut buf).unwrap(), 0);
}

#[test]
fn track_unaligned_read_uses_at_most_two_sector_reads() {
    let bed = TestBed::new();
    bed.insert_disc();
    let session = bed.session();
    let mut file = session.open("/gdrom/session1/track01.iso", &read_only()).unwrap();
    assert_eq!(file.get_attr().unwrap().size(), (TRACK1_SECTORS * 2048) as u64);

    // Seek by reading: the cursor is owned by the handle and only moves
    // forward.
    let mut skip = vec![0u8; 3000];
    assert_eq!(file.read(&mut skip).unwrap(), 3000);
    bed.drive.clear_log();

    let mut buf = [0u8; 100];
    assert_eq!(file.read(&mut buf).unwrap(), 100);
    assert_eq!(&buf[..], &bed.track1[3000..3100]);
    let log = bed.drive.read_log();
    assert!(log.len() <= 2, "issued {} sector reads", log.len());
}

#[test]
fn track_reads_span_sector_boundaries() {
    let bed = TestBed::new();
    bed.insert_disc();
    let session = bed.session();
    let mut file = session.open("/gdrom/session1/track01.iso", &read_only()).unwrap();
    let mut out = Vec::new();
    let mut chunk = vec![0u8; 999];
    loop {
        let n = file.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&chunk[..n]);
    }
    assert_eq!(out, bed.track1);
    assert!(file.eof());
}

#[test]
fn random_ranges_match_the_source_image() {
    let bed = TestBed::new();
    bed.insert_disc();
    let session = bed.session();
    let mut rng = rand::thread_rng();
    let len = bed.track1.len();
    for _ in 0..20 {
        let offset = rng.gen_range(0..len);
        let size = rng.gen_range(1..=(len - offset).min(5000));
        let mut file = session.open("/gdrom/session1/track01.iso", &read_only()).unwrap();
        let mut skip = vec![0u8; offset];
        assert_eq!(file.read(&mut skip).unwrap(), offset);
        let mut buf = vec![0u8; size];
        assert_eq!(file.read(&mut buf).unwrap(), size);
        assert_eq!(buf, &bed.track1[offset..offset + size], "range {offset}..{}", offset + size);
    }
}

#[test]
fn audio_tracks_use_raw_sectors() {
    let bed = TestBed::new();
    bed.insert_disc();
    let session = bed.session();
    let mut file = session.open("/gdrom/session1/track02.cdda", &read_only()).unwrap();
    assert_eq!(file.get_attr().unwrap().size(), 2 * 2352);
    let before = bed.drive.set_type_count();
    let mut buf = [0u8; 100];
    assert_eq!(file.read(&mut buf).unwrap(), 100);
    assert_eq!(&buf[..], &bed.track2[..100]);
    // Switching from data to audio reprograms the transfer mode.
    assert_eq!(bed.drive.set_type_count(), before + 1);
}

#[test]
fn sector_mode_cache_survives_reads_but_not_remounts() {
    let bed = TestBed::new();
    bed.insert_disc();
    let session = bed.session();
    let mut buf = [0u8; 64];

    let mut file = session.open("/gdrom/session1/track01.iso", &read_only()).unwrap();
    file.read(&mut buf).unwrap();
    file.read(&mut buf).unwrap();
    assert_eq!(bed.drive.set_type_count(), 1);
    drop(file);

    // Eject and re-insert: the first read after the rebuild must program
    // the drive again even though the mode did not change.
    bed.deliver_state(status::OPEN);
    assert!(!bed.backend.is_mounted());
    bed.deliver_state(status::PAUSED);
    assert!(bed.backend.is_mounted());

    let mut file = session.open("/gdrom/session1/track01.iso", &read_only()).unwrap();
    file.read(&mut buf).unwrap();
    assert_eq!(bed.drive.set_type_count(), 2);
}

#[test]
fn toc_leaf_carries_the_raw_toc() {
    let bed = TestBed::new();
    bed.insert_disc();
    let session = bed.session();
    let mut drive = bed.drive.clone();
    let expected = drive.read_toc(0).unwrap().as_bytes();

    let mut file = session.open("/gdrom/session1/toc", &read_only()).unwrap();
    assert_eq!(file.get_attr().unwrap().size(), expected.len() as u64);
    let mut buf = vec![0u8; expected.len()];
    assert_eq!(file.read(&mut buf).unwrap(), expected.len());
    assert_eq!(buf, expected);
}

#[test]
fn hot_unmount_orphans_open_handles() {
    let bed = TestBed::new();
    bed.insert_disc();
    let session = bed.session();
    let mut file = session.open("/gdrom/session1/track01.iso", &read_only()).unwrap();
    let mut dir = session.opendir("/gdrom/session1").unwrap();
    assert_eq!(dir.read_entry().unwrap().unwrap().name(), "toc");

    bed.deliver_state(status::OPEN);
    assert!(!bed.backend.is_mounted());

    let mut buf = [0u8; 16];
    assert_eq!(file.read(&mut buf).unwrap_err(), VfsError::StaleHandle);
    assert_eq!(dir.read_entry().unwrap_err(), VfsError::StaleHandle);
    // Orphaned handles still close cleanly.
    file.close().unwrap();
    dir.close().unwrap();

    assert_eq!(session.stat("/gdrom").unwrap_err(), VfsError::NotFound);
    assert_eq!(
        session.opendir("/gdrom").unwrap_err(),
        VfsError::NotADirectory
    );
}

#[test]
fn readdir_yields_each_child_once() {
    let bed = TestBed::new();
    bed.insert_disc();
    let session = bed.session();
    for path in ["/", "/flash", "/gdrom", "/gdrom/session1"] {
        let names = list_names(&session, path);
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len(), "duplicate entry under {path}");
    }
}

#[test]
fn parent_links_match_child_lists() {
    let bed = TestBed::new();
    bed.insert_disc();
    let _guard = bed.vfs.lock();
    for path in ["/rom", "/flash/partition2", "/gdrom/session1/track01.iso"] {
        let (node, offs) = bed.vfs.resolve(path);
        assert_eq!(offs, path.len(), "{path} did not fully resolve");
        let parent = node.parent().expect("non-root node has a parent");
        // The parent's child list reaches the node by name exactly once.
        let (again, _) = bed.vfs.resolve(path);
        assert!(Arc::ptr_eq(&node, &again));
        assert!(parent.is_dir());
    }
    let (root, _) = bed.vfs.resolve("/");
    assert!(root.parent().is_none());
    assert_eq!(root.name(), "");
}

#[test]
fn mutating_operations_are_refused() {
    let bed = TestBed::new();
    let session = bed.session();
    assert_eq!(session.create_dir("/x").unwrap_err(), VfsError::Unsupported);
    assert_eq!(session.remove_dir("/flash").unwrap_err(), VfsError::Unsupported);
    assert_eq!(session.remove_file("/rom").unwrap_err(), VfsError::Unsupported);
    assert_eq!(
        session.rename("/rom", "/rom2").unwrap_err(),
        VfsError::Unsupported
    );

    let mut write = OpenOptions::new();
    write.read(true);
    write.write(true);
    assert_eq!(session.open("/rom", &write).unwrap_err(), VfsError::ReadOnly);

    let mut file = session.open("/rom", &read_only()).unwrap();
    assert_eq!(file.write(b"nope").unwrap_err(), VfsError::Unsupported);
}

#[test]
fn lookup_errors_carry_fixed_codes() {
    let bed = TestBed::new();
    let session = bed.session();
    assert_eq!(session.stat("/missing").unwrap_err(), VfsError::NotFound);
    assert_eq!(session.stat("/rom/extra").unwrap_err(), VfsError::NotFound);
    assert_eq!(
        session.opendir("/rom").unwrap_err(),
        VfsError::NotADirectory
    );
    assert_eq!(
        session.open("/missing", &read_only()).unwrap_err(),
        VfsError::NotFound
    );
    assert_eq!(
        session.open("/", &read_only()).unwrap_err(),
        VfsError::Unsupported
    );
    assert_eq!(session.chdir("/missing").unwrap_err(), VfsError::NotFound);
    assert_eq!(session.chdir("/rom").unwrap_err(), VfsError::NotADirectory);
    assert_eq!(VfsError::NotFound.code(), 2);
    assert_eq!(VfsError::StaleHandle.code(), 116);
}

#[test]
fn stat_reports_directory_bits() {
    let bed = TestBed::new();
    bed.insert_disc();
    let session = bed.session();
    assert_eq!(session.stat("/").unwrap().file_type(), VfsNodeType::Dir);
    assert_eq!(session.stat("/flash").unwrap().file_type(), VfsNodeType::Dir);
    assert_eq!(session.stat("/gdrom/session1").unwrap().file_type(), VfsNodeType::Dir);
    assert_eq!(session.stat("/rom").unwrap().file_type(), VfsNodeType::File);
    assert_eq!(session.stat("/rom").unwrap().mtime(), 0);
}

#[test]
fn element_reads_never_split_elements() {
    let bed = TestBed::new();
    let session = bed.session();
    let mut file = session.open("/flash/partition2", &read_only()).unwrap();
    // 0x1000 bytes in 3-byte elements: 1365 whole elements, one byte left.
    let mut buf = vec![0u8; 0x1000];
    assert_eq!(file.read_elems(&mut buf, 3, 2000).unwrap(), 1365);
    assert_eq!(file.position(), 4095);
    assert!(!file.eof());
    assert_eq!(file.read_elems(&mut buf, 3, 1).unwrap(), 0);
    assert_eq!(file.read_elems(&mut buf, 1, 8).unwrap(), 1);
    assert!(file.eof());
    assert_eq!(
        file.read_elems(&mut buf, 0, 1).unwrap_err(),
        VfsError::InvalidInput
    );
}

#[test]
fn sessions_have_independent_cwds() {
    let bed = TestBed::new();
    let a = bed.session();
    let b = bed.session();
    a.chdir("/flash").unwrap();
    assert_eq!(a.current_dir().as_str(), "/flash");
    assert_eq!(b.current_dir().as_str(), "/");
    b.chdir("/").unwrap();
    assert_eq!(a.stat("partition0").unwrap().size(), 0x2000);
}

#[test]
fn engine_drop_orphans_leftover_handles() {
    let bed = TestBed::new();
    let session = bed.session();
    let mut file = session.open("/rom", &read_only()).unwrap();
    drop(session);
    drop(bed.monitor);
    drop(bed.backend);
    drop(bed.vfs);
    let mut buf = [0u8; 4];
    assert_eq!(file.read(&mut buf).unwrap_err(), VfsError::StaleHandle);
    file.close().unwrap();
}

#[test]
fn concurrent_readers_survive_media_churn() {
    let bed = TestBed::new();
    bed.insert_disc();
    let vfs = bed.vfs.clone();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let vfs = vfs.clone();
            std::thread::spawn(move || {
                let session = vfs.open_session();
                for _ in 0..200 {
                    match session.open("/gdrom/session1/track01.iso", &read_only()) {
                        Ok(mut file) => {
                            let mut buf = [0u8; 512];
                            match file.read(&mut buf) {
                                Ok(_)
                                | Err(VfsError::StaleHandle)
                                | Err(VfsError::NoMedium) => {}
                                Err(e) => panic!("unexpected read error: {e:?}"),
                            }
                        }
                        Err(VfsError::NotFound)
                        | Err(VfsError::NotADirectory)
                        | Err(VfsError::Unsupported) => {}
                        Err(e) => panic!("unexpected open error: {e:?}"),
                    }
                    let mut rom = session.open("/rom", &read_only()).unwrap();
                    let mut buf = [0u8; 64];
                    rom.read(&mut buf).unwrap();
                }
            })
        })
        .collect();
    for i in 0..40 {
        bed.deliver_state(if i % 2 == 0 { status::OPEN } else { status::PAUSED });
    }
    for t in readers {
        t.join().unwrap();
    }
}

#[test]
fn monitor_threads_track_the_drive() {
    let bed = TestBed::new();
    let handle = bed.monitor.spawn();
    bed.drive.set_status(status::PAUSED);
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while !bed.backend.is_mounted() && std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    assert!(bed.backend.is_mounted(), "monitor never mounted the disc");

    bed.drive.set_status(status::OPEN);
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while bed.backend.is_mounted() && std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    assert!(!bed.backend.is_mounted(), "monitor never unmounted the disc");
    handle.stop();
}
