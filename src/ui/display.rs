// Tue Jan 13 2026 - Alex

use crate::gc::{HeapError, Location, TraversalSummary};
use crate::memory::Address;
use crate::roots::{LiveSet, RootPath, RootSet};
use crate::session::HeapSession;
use crate::stats::{FinalizerSummary, GenerationUsage, HeapStat, HeapUsage, QueueList};
use crate::ui::table::{Alignment, TableBuilder};
use crate::utils::{format_bytes, truncate_string};
use colored::*;
use serde::Serialize;

const MAX_NAME_WIDTH: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentRow {
    pub heap: usize,
    pub kind: String,
    pub segment: Address,
    pub start: Address,
    pub end: Address,
    pub committed: Address,
    pub reserved: Address,
    pub size: u64,
}

pub fn segment_rows(session: &HeapSession) -> Vec<SegmentRow> {
    session
        .snapshot()
        .segments()
        .iter()
        .map(|segment| {
            let range = segment.object_range();
            SegmentRow {
                heap: segment.heap(),
                kind: segment.kind().to_string(),
                segment: segment.address(),
                start: range.start(),
                end: range.end(),
                committed: segment.committed_range(session.layout()).end(),
                reserved: segment.reserved_range().end(),
                size: range.size(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRow {
    pub method_table: Address,
    pub name: String,
    pub count: u64,
    pub total_size: u64,
}

pub fn type_rows(session: &HeapSession, stat: &HeapStat<Address>, top: Option<usize>) -> Vec<TypeRow> {
    stat.iter()
        .take(top.unwrap_or(usize::MAX))
        .map(|entry| TypeRow {
            method_table: entry.key,
            name: session.type_name(entry.key),
            count: entry.count,
            total_size: entry.total_size,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveReport {
    pub roots: usize,
    pub dependent_handles: usize,
    pub live_objects: usize,
    pub live_bytes: u64,
    pub root_failures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<Address>>,
}

impl LiveReport {
    pub fn new(roots: &RootSet, live: &LiveSet, list_objects: bool) -> Self {
        Self {
            roots: roots.len(),
            dependent_handles: roots.dependent_handles().len(),
            live_objects: live.len(),
            live_bytes: live.bytes(),
            root_failures: roots.failures().iter().map(HeapError::to_string).collect(),
            objects: list_objects.then(|| live.sorted()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LocateReport {
    pub address: Address,
    pub location: Option<Location>,
    pub object: Option<Address>,
    pub object_size: Option<u64>,
    pub type_name: Option<String>,
}

impl LocateReport {
    pub fn new(session: &HeapSession, address: Address, location: Option<Location>) -> Self {
        let object = location.and_then(|l| l.object);
        Self {
            address,
            location,
            object: object.map(|o| o.address),
            object_size: object.map(|o| o.size),
            type_name: object.map(|o| session.type_name(o.method_table)),
        }
    }
}

/// Renders command results as terminal tables.
pub struct DisplayRenderer {
    use_color: bool,
}

impl DisplayRenderer {
    pub fn new() -> Self {
        Self { use_color: true }
    }

    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    fn table(&self, headers: &[&str]) -> TableBuilder {
        TableBuilder::new().with_headers(headers).with_color(self.use_color)
    }

    fn heading(&self, title: &str) -> String {
        if self.use_color {
            title.cyan().bold().to_string()
        } else {
            title.to_string()
        }
    }

    fn status(&self, ok: bool, message: &str) -> String {
        match (self.use_color, ok) {
            (false, _) => message.to_string(),
            (true, true) => message.green().to_string(),
            (true, false) => message.red().bold().to_string(),
        }
    }

    pub fn render_segments(&self, rows: &[SegmentRow]) -> String {
        let mut table = self
            .table(&["Heap", "Kind", "Segment", "Begin", "Allocated", "Committed", "Size"])
            .with_alignment(0, Alignment::Right)
            .with_alignment(6, Alignment::Right);
        for row in rows {
            table.push_row(&[
                row.heap.to_string(),
                row.kind.clone(),
                row.segment.to_string(),
                row.start.to_string(),
                row.end.to_string(),
                row.committed.to_string(),
                format_bytes(row.size),
            ]);
        }
        let total: u64 = rows.iter().map(|r| r.size).sum();
        table
            .with_footer(&["", "Total", "", "", "", "", format_bytes(total).as_str()])
            .build()
    }

    pub fn render_types(&self, rows: &[TypeRow], total: (u64, u64)) -> String {
        let mut table = self
            .table(&["MT", "Count", "TotalSize", "Class Name"])
            .with_alignment(1, Alignment::Right)
            .with_alignment(2, Alignment::Right);
        for row in rows {
            table.push_row(&[
                row.method_table.to_string(),
                row.count.to_string(),
                row.total_size.to_string(),
                truncate_string(&row.name, MAX_NAME_WIDTH),
            ]);
        }
        table
            .with_footer(&["Total".to_string(), total.0.to_string(), total.1.to_string(), "objects".to_string()])
            .build()
    }

    pub fn render_strings(&self, stat: &HeapStat<String>, top: Option<usize>) -> String {
        let mut table = self
            .table(&["Count", "TotalSize", "Value"])
            .with_alignment(0, Alignment::Right)
            .with_alignment(1, Alignment::Right);
        for entry in stat.iter().take(top.unwrap_or(usize::MAX)) {
            let value = entry.key.replace(['\r', '\n', '\t'], " ");
            table.push_row(&[
                entry.count.to_string(),
                entry.total_size.to_string(),
                truncate_string(&value, MAX_NAME_WIDTH),
            ]);
        }
        let (objects, bytes) = stat.total();
        table
            .with_footer(&[objects.to_string(), bytes.to_string(), "strings".to_string()])
            .build()
    }

    pub fn render_verification(&self, summary: &TraversalSummary) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "Walked {} objects ({}) in {} segments, {} free objects\n",
            summary.objects,
            format_bytes(summary.bytes),
            summary.segments,
            summary.free_objects
        ));

        if !summary.diagnostics.is_empty() {
            output.push_str(&format!("\n{}\n", self.heading("Segment errors")));
            for error in &summary.diagnostics {
                output.push_str(&format!("  - {}\n", self.status(false, &error.to_string())));
            }
        }

        if let Some(report) = &summary.verification {
            output.push('\n');
            output.push_str(&report.format_report());
        }

        let verdict = if summary.is_clean() {
            self.status(true, "No heap corruption detected.")
        } else {
            self.status(false, "Heap corruption detected.")
        };
        output.push_str(&format!("\n{}\n", verdict));
        output
    }

    pub fn render_live(&self, report: &LiveReport) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", self.heading("Reachability")));
        output.push_str(&format!("  Roots:             {}\n", report.roots));
        output.push_str(&format!("  Dependent handles: {}\n", report.dependent_handles));
        output.push_str(&format!("  Live objects:      {}\n", report.live_objects));
        output.push_str(&format!("  Live bytes:        {}\n", format_bytes(report.live_bytes)));
        for failure in &report.root_failures {
            output.push_str(&format!("  {}\n", self.status(false, &format!("root source failed: {}", failure))));
        }
        if let Some(objects) = &report.objects {
            output.push('\n');
            for object in objects {
                output.push_str(&format!("  {}\n", object));
            }
        }
        output
    }

    pub fn render_location(&self, report: &LocateReport) -> String {
        let Some(location) = &report.location else {
            return format!("{} is not in the GC heap.\n", report.address);
        };
        let mut output = format!(
            "{} is in heap {}, {} segment {}, generation {}\n",
            report.address, location.heap, location.kind, location.segment, location.generation
        );
        match (report.object, &report.type_name) {
            (Some(object), Some(name)) => {
                let offset = report.address.distance_from(object);
                output.push_str(&format!(
                    "  object {} ({}, {} bytes) + {:#x}\n",
                    object,
                    name,
                    report.object_size.unwrap_or(0),
                    offset
                ));
            }
            _ => output.push_str("  not inside a walkable object\n"),
        }
        output
    }

    pub fn render_root_path(&self, session: &HeapSession, target: Address, path: Option<&RootPath>) -> String {
        let Some(path) = path else {
            return format!("Found no path from a root to {}.\n", target);
        };
        let mut output = format!("{}\n", self.heading(&path.root.source.to_string()));
        for (depth, object) in path.chain.iter().enumerate() {
            let name = session
                .object_reader()
                .method_table_of(*object)
                .map(|mt| session.type_name(mt))
                .unwrap_or_else(|_| "<unreadable>".to_string());
            let arrow = if depth == 0 { "" } else { "-> " };
            output.push_str(&format!("{}{}{} {}\n", "  ".repeat(depth + 1), arrow, object, name));
        }
        output
    }

    fn generation_label(gen: u32, count: usize) -> String {
        // the last two entries are LOH and POH
        match count.saturating_sub(gen as usize + 1) {
            0 => "POH".to_string(),
            1 => "LOH".to_string(),
            _ => format!("gen{}", gen),
        }
    }

    fn usage_cells(label: String, usage: &GenerationUsage) -> Vec<String> {
        vec![
            label,
            format_bytes(usage.allocated),
            format_bytes(usage.committed),
            format_bytes(usage.free),
            usage.unrooted.map(format_bytes).unwrap_or_else(|| "-".to_string()),
        ]
    }

    pub fn render_usage(&self, usage: &[HeapUsage]) -> String {
        let mut sections = Vec::new();
        for heap in usage {
            let mut table = self
                .table(&["Generation", "Allocated", "Committed", "Free", "Unrooted"])
                .with_alignment(1, Alignment::Right)
                .with_alignment(2, Alignment::Right)
                .with_alignment(3, Alignment::Right)
                .with_alignment(4, Alignment::Right);
            let count = heap.generations.len();
            for gen in &heap.generations {
                table.push_row(&Self::usage_cells(Self::generation_label(gen.generation, count), gen));
            }
            let total = Self::usage_cells("Total".to_string(), &heap.total());
            sections.push(format!(
                "{}\n{}",
                self.heading(&format!("Heap {}", heap.heap)),
                table.with_footer(&total).build()
            ));
        }
        sections.join("\n\n")
    }

    pub fn render_finalizers(&self, session: &HeapSession, summary: &FinalizerSummary) -> String {
        let mut ranges = self
            .table(&["Heap", "Queue", "Start", "End", "Count"])
            .with_alignment(4, Alignment::Right);
        for range in &summary.ranges {
            let list = match range.list {
                QueueList::Generation(gen) => format!("gen{}", gen),
                QueueList::Ready => "ready".to_string(),
            };
            ranges.push_row(&[
                range.heap.to_string(),
                list,
                range.start.to_string(),
                range.end.to_string(),
                range.count.to_string(),
            ]);
        }

        let rows = type_rows(session, &summary.by_type, None);
        let mut output = format!("{}\n{}\n\n", self.heading("Finalize queues"), ranges.build());
        output.push_str(&format!("  Registered for finalization: {}\n", summary.finalizable));
        output.push_str(&format!("  Ready for finalization:      {}\n\n", summary.ready));
        output.push_str(&self.render_types(&rows, summary.by_type.total()));
        output.push('\n');

        if let Some(unreachable) = &summary.unreachable {
            output.push_str(&format!(
                "\n{}\n",
                self.heading(&format!("{} registered objects are unreachable", unreachable.len()))
            ));
            for object in unreachable {
                output.push_str(&format!("  {}\n", object));
            }
        }
        output
    }
}

impl Default for DisplayRenderer {
    fn default() -> Self {
        Self::new()
    }
}
