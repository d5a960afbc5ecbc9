//! The dynamic linking table, shared by dynamic sections and segments.

use crate::elf::abi::{self, TypeQuery};
use crate::elf::Dyn;
use crate::file::ElfFile;
use crate::input::ElfReader;
use crate::Result;
use core::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A dynamic table: a run of `(tag, value)` records terminated by
/// `DT_NULL`.
///
/// Both `SHT_DYNAMIC` sections and `PT_DYNAMIC` segments embed this view;
/// only the starting file offset differs. The logical length of the table
/// is *not* taken from the host's declared byte size: the first `DT_NULL`
/// tag is the sole authoritative terminator, and it is only discoverable
/// by walking.
pub struct DynamicTable {
    start: u64,
    tags: RefCell<HashMap<usize, Rc<DynamicTag>>>,
}

impl DynamicTable {
    pub(crate) fn new(start: u64) -> Self {
        Self {
            start,
            tags: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the `n`-th tag, decoding it lazily and caching it.
    ///
    /// There is no upper bound to check against, so a far-out index fails
    /// with a stream error rather than returning absence.
    pub fn tag_at<R: ElfReader>(&self, elf: &ElfFile<R>, n: usize) -> Result<Rc<DynamicTag>> {
        if let Some(cached) = self.tags.borrow().get(&n).cloned() {
            return Ok(cached);
        }
        let entsize = Dyn::size_of(elf.class()) as u64;
        let mut buf = vec![0u8; entsize as usize];
        elf.read_exact(self.start + n as u64 * entsize, &mut buf)?;
        let record = Dyn::parse(&buf, elf.class(), elf.endian());
        let tag = Rc::new(DynamicTag { record });
        Ok(self
            .tags
            .borrow_mut()
            .entry(n)
            .or_insert(tag)
            .clone())
    }

    /// Returns all tags in walk order.
    ///
    /// The walk stops *after* yielding the first `DT_NULL` tag, so the
    /// returned sequence always ends with exactly one terminator
    /// regardless of the host table's declared size.
    pub fn tags<R: ElfReader>(&self, elf: &ElfFile<R>) -> Result<Vec<Rc<DynamicTag>>> {
        let mut out = Vec::new();
        for n in 0.. {
            let tag = self.tag_at(elf, n)?;
            let done = tag.tag() == abi::DT_NULL;
            out.push(tag);
            if done {
                break;
            }
        }
        Ok(out)
    }

    /// Returns the first tag of the given type in walk order, or
    /// `Ok(None)` when the walk reaches `DT_NULL` without a match.
    ///
    /// The type accepts the same tolerant forms as the by-type queries on
    /// [`ElfFile`]: integer code, bare name (`"needed"`) or prefixed name
    /// (`"DT_NEEDED"`).
    ///
    /// # Errors
    ///
    /// A lookup error if the type does not resolve to a known `DT_`
    /// constant.
    pub fn tag_by_type<R: ElfReader>(
        &self,
        elf: &ElfFile<R>,
        d_tag: impl Into<TypeQuery>,
    ) -> Result<Option<Rc<DynamicTag>>> {
        let code = abi::DT.resolve(&d_tag.into())?;
        for n in 0.. {
            let tag = self.tag_at(elf, n)?;
            if tag.tag() == code {
                return Ok(Some(tag));
            }
            if tag.tag() == abi::DT_NULL {
                return Ok(None);
            }
        }
        unreachable!()
    }
}

/// A single `(tag, value)` entry of a dynamic table.
pub struct DynamicTag {
    record: Dyn,
}

impl DynamicTag {
    /// The decoded dynamic record.
    pub fn header(&self) -> &Dyn {
        &self.record
    }

    /// The tag key (`DT_*`).
    pub fn tag(&self) -> i64 {
        self.record.d_tag
    }

    /// The value or address carried by the entry.
    pub fn value(&self) -> u64 {
        self.record.d_val
    }

    /// The symbolic name of the tag, if it is a known `DT_` constant.
    pub fn tag_name(&self) -> Option<&'static str> {
        abi::DT.name_of(self.record.d_tag)
    }
}
