/// Vertex pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VertexPoolOpts {
    /// Total vertices the backing buffer holds.
    pub capacity_vertices: u32,
}

impl Default for VertexPoolOpts {
    fn default() -> Self {
        Self {
            capacity_vertices: 1 << 20,
        }
    }
}

/// Contiguous lease of vertex slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexRange {
    pub offset: u32,
    pub count: u32,
}

impl VertexRange {
    fn end(self) -> u32 {
        self.offset + self.count
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VertexPoolStats {
    pub allocations: u64,
    pub releases: u64,
    pub failures: u64,
    pub in_use: u32,
    pub peak_in_use: u32,
}

/// First-fit allocator over one shared vertex buffer.
///
/// Free ranges stay sorted by offset and adjacent ranges coalesce on release.
#[derive(Debug)]
pub struct VertexPool {
    opts: VertexPoolOpts,
    free: Vec<VertexRange>,
    stats: VertexPoolStats,
}

impl VertexPool {
    pub fn new(opts: VertexPoolOpts) -> Self {
        let free = if opts.capacity_vertices > 0 {
            vec![VertexRange {
                offset: 0,
                count: opts.capacity_vertices,
            }]
        } else {
            Vec::new()
        };
        Self {
            opts,
            free,
            stats: VertexPoolStats::default(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.opts.capacity_vertices
    }

    pub fn stats(&self) -> VertexPoolStats {
        self.stats
    }

    /// Free vertices across all ranges.
    pub fn available(&self) -> u32 {
        self.free.iter().map(|r| r.count).sum()
    }

    pub fn largest_free(&self) -> u32 {
        self.free.iter().map(|r| r.count).max().unwrap_or(0)
    }

    /// Lease `count` contiguous vertices, or `None` when no free range is large enough.
    pub fn acquire(&mut self, count: u32) -> Option<VertexRange> {
        if count == 0 {
            return Some(VertexRange { offset: 0, count: 0 });
        }
        let Some(i) = self.free.iter().position(|r| r.count >= count) else {
            self.stats.failures = self.stats.failures.saturating_add(1);
            return None;
        };
        let slot = &mut self.free[i];
        let lease = VertexRange {
            offset: slot.offset,
            count,
        };
        slot.offset += count;
        slot.count -= count;
        if slot.count == 0 {
            self.free.remove(i);
        }
        self.stats.allocations = self.stats.allocations.saturating_add(1);
        self.stats.in_use += count;
        self.stats.peak_in_use = self.stats.peak_in_use.max(self.stats.in_use);
        Some(lease)
    }

    pub fn release(&mut self, range: VertexRange) {
        if range.count == 0 {
            return;
        }
        let i = self.free.partition_point(|r| r.offset < range.offset);
        self.free.insert(i, range);
        // Merge with the following range, then with the preceding one.
        if i + 1 < self.free.len() && self.free[i].end() == self.free[i + 1].offset {
            self.free[i].count += self.free[i + 1].count;
            self.free.remove(i + 1);
        }
        if i > 0 && self.free[i - 1].end() == self.free[i].offset {
            self.free[i - 1].count += self.free[i].count;
            self.free.remove(i);
        }
        self.stats.releases = self.stats.releases.saturating_add(1);
        self.stats.in_use = self.stats.in_use.saturating_sub(range.count);
    }
}
