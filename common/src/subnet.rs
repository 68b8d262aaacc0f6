//! Address planning for subnets carved out of a parent network.
//!
//! Blocks are handed out from the top of the parent range downward so that
//! load-balancer subnets stay clear of the low ranges operators usually
//! assign by hand.

use std::{fmt, net::Ipv4Addr, str::FromStr};

use crate::{Error, Result};

/// An IPv4 prefix with its inclusive numeric range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressBlock {
    base: Ipv4Addr,
    prefix_len: u8,
    start: u32,
    end: u32,
}

impl AddressBlock {
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        if prefix_len > 32 {
            return Err(Error::validation(format!(
                "prefix length /{prefix_len} is longer than 32 bits"
            )));
        }
        let mask = mask(prefix_len);
        let start = u32::from(addr) & mask;
        Ok(Self {
            base: Ipv4Addr::from(start),
            prefix_len,
            start,
            end: start | !mask,
        })
    }

    pub fn base(&self) -> Ipv4Addr {
        self.base
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn overlaps(&self, other: &AddressBlock) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

fn mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        p => u32::MAX << (32 - u32::from(p)),
    }
}

impl FromStr for AddressBlock {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::validation(format!("invalid CIDR '{s}'"));
        let (addr, prefix) = s.trim().split_once('/').ok_or_else(invalid)?;
        let addr: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        Self::new(addr, prefix)
    }
}

impl fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix_len)
    }
}

/// Returns up to `max_count` blocks of size `/prefix_len` inside `parent`,
/// highest addresses first, none of which overlaps a block in `existing`.
pub fn plan_subnets<S: AsRef<str>>(
    parent: &str,
    existing: &[S],
    prefix_len: u8,
    max_count: usize,
) -> Result<Vec<AddressBlock>> {
    let parent: AddressBlock = parent.parse()?;
    if prefix_len > 32 {
        return Err(Error::validation(format!(
            "requested prefix /{prefix_len} is longer than 32 bits"
        )));
    }
    if parent.prefix_len > prefix_len {
        return Err(Error::validation(format!(
            "parent network {parent} cannot hold a /{prefix_len} block"
        )));
    }
    let existing = existing
        .iter()
        .map(|s| s.as_ref().parse::<AddressBlock>())
        .collect::<Result<Vec<_>>>()?;

    let size = 1u64 << (32 - u32::from(prefix_len));
    let floor = u64::from(parent.start);
    let mut candidate = Some((u64::from(parent.end) + 1 - size) & !(size - 1));

    let mut planned = Vec::with_capacity(max_count);
    while planned.len() < max_count {
        let Some(start) = candidate.filter(|s| *s >= floor) else {
            break;
        };
        let block = AddressBlock::new(Ipv4Addr::from(start as u32), prefix_len)?;
        if !existing.iter().any(|e| e.overlaps(&block)) {
            planned.push(block);
        }
        candidate = start.checked_sub(size);
    }

    tracing::debug!(%parent, prefix_len, ?planned, "planned subnets");
    Ok(planned)
}
