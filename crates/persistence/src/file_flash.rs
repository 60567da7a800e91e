// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Flash device persisted as a hex dump file.
//!
//! All operations run against an in-memory `RamFlash`. `sync` writes the whole
//! image to a temporary file next to the dump and renames it over the dump,
//! so a crash during `sync` leaves either the old or the new image on disk.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use gpnvm::{FlashAddress, FlashDevice, FlashError, FlashGeometry, RamFlash};

use crate::dump;
use crate::error::Result;

pub struct FileFlash {
    path: PathBuf,
    flash: RamFlash,
    dirty: bool,
}

impl FileFlash {
    /// Loads the dump at `path`, or starts from an erased device if the file
    /// does not exist yet.
    pub fn open(path: impl AsRef<Path>, geometry: FlashGeometry) -> Result<Self> {
        geometry.validate()?;
        let path = path.as_ref().to_path_buf();

        let flash = match File::open(&path) {
            Ok(file) => {
                let image = dump::parse_dump(BufReader::new(file), &geometry)?;
                tracing::info!("Loaded flash image from {:?}", path);
                RamFlash::from_image(geometry, image)?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No flash image at {:?}, starting erased", path);
                RamFlash::new(geometry)?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            flash,
            dirty: false,
        })
    }

    /// Writes the image to disk if it changed since the last sync (or was
    /// never written).
    pub fn sync(&mut self) -> Result<()> {
        if !self.dirty && self.path.exists() {
            return Ok(());
        }

        let tmp = self.path.with_extension("tmp");
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            dump::write_dump(&mut out, &self.flash.geometry(), self.flash.raw())?;
            out.flush()?;
            out.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        self.dirty = false;
        tracing::debug!("Flash image synced to {:?}", self.path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn inner(&self) -> &RamFlash {
        &self.flash
    }

    /// Direct access to the image. Marks it dirty.
    pub fn inner_mut(&mut self) -> &mut RamFlash {
        self.dirty = true;
        &mut self.flash
    }

    pub fn into_inner(self) -> RamFlash {
        self.flash
    }
}

impl FlashDevice for FileFlash {
    fn geometry(&self) -> FlashGeometry {
        self.flash.geometry()
    }

    fn erase(&mut self, page: FlashAddress) -> std::result::Result<(), FlashError> {
        self.flash.erase(page)?;
        self.dirty = true;
        Ok(())
    }

    fn write(&mut self, addr: FlashAddress, data: &[u8]) -> std::result::Result<(), FlashError> {
        self.flash.write(addr, data)?;
        self.dirty = true;
        Ok(())
    }

    fn read(&mut self, addr: FlashAddress, buf: &mut [u8]) -> std::result::Result<(), FlashError> {
        self.flash.read(addr, buf)
    }
}
