/// An executable section of the image, with its bytes copied out of the file.
#[derive(Debug, Clone)]
pub struct CodeSection {
    pub name: String,
    pub start: u64,
    pub data: Vec<u8>,
}

impl CodeSection {
    pub fn new(name: String, start: u64, data: Vec<u8>) -> Self {
        Self { name, start, data }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn end(&self) -> u64 {
        self.start + self.size()
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end()
    }

    /// Clip `[low_addr, high_addr)` to this section, `None` if they don't overlap.
    pub fn clip_range(&self, low_addr: u64, high_addr: u64) -> Option<(u64, u64)> {
        let new_start = self.start.max(low_addr);
        let new_end = self.end().min(high_addr);
        if new_start < new_end {
            Some((new_start, new_end))
        } else {
            None
        }
    }

    /// Bytes for `[start, start + size)`. The range is clipped at the section
    /// end; a start outside the section yields `None`.
    pub fn bytes(&self, start: u64, size: u64) -> Option<&[u8]> {
        if size == 0 {
            return (start >= self.start && start <= self.end()).then_some(&[][..]);
        }
        if !self.contains(start) {
            return None;
        }
        let (lo, hi) = self.clip_range(start, start.saturating_add(size))?;
        let lo = (lo - self.start) as usize;
        let hi = (hi - self.start) as usize;
        self.data.get(lo..hi)
    }
}
