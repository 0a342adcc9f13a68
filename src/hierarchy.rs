//! Site hierarchy: navigation links and table of contents.
//!
//! Pages are registered in order with an outline level, the same way
//! headings nest in a document. [`Site`] keeps the parent of every page as
//! it is pushed, so navigation and outline rendering never rescan the list.

use std::ops::Range;

use crate::constants::{NAVIGATION_MACROS, NEWLINE_MACRO};
use crate::context::{root_path, Context};
use crate::macros::marker;
use crate::processor::output_name;
use crate::substitute::{call, expand};

/// A source file registered with an outline level and a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub path: String,
    pub level: usize,
    pub title: String,
}

impl PageEntry {
    pub fn new<P: Into<String>, T: Into<String>>(path: P, level: usize, title: T) -> Self {
        Self { path: path.into(), level, title: title.into() }
    }
}

/// Neighbours of a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Navigation {
    pub up: Option<usize>,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

/// One step of an outline walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineEvent {
    /// Opens a nested list at the given level
    Open(usize),
    /// Emits the page with the given index
    Item(usize),
    /// Closes the list at the given level
    Close(usize),
}

/// Ordered page list with parent pointers.
#[derive(Debug, Clone, Default)]
pub struct Site {
    pages: Vec<PageEntry>,
    parents: Vec<Option<usize>>,
}

impl Site {
    pub fn push(&mut self, page: PageEntry) {
        // The parent is the nearest earlier page with a lower level; walking
        // parent pointers from the previous page reaches it directly.
        let mut candidate = self.pages.len().checked_sub(1);
        while let Some(index) = candidate {
            if self.pages[index].level < page.level {
                break;
            }
            candidate = self.parents[index];
        }
        self.parents.push(candidate);
        self.pages.push(page);
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.parents.clear();
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PageEntry> {
        self.pages.get(index)
    }

    pub fn pages(&self) -> &[PageEntry] {
        &self.pages
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    pub fn navigation(&self, index: usize) -> Navigation {
        let up = self.parent(index);
        let prev = index.checked_sub(1).filter(|&prev| Some(prev) != up);
        let next = Some(index + 1).filter(|&next| next < self.pages.len());
        Navigation { up, prev, next }
    }

    /// Indices of the pages nested below `index`.
    pub fn descendants(&self, index: usize) -> Range<usize> {
        let Some(page) = self.pages.get(index) else {
            return 0..0;
        };
        let end = self.pages[index + 1..]
            .iter()
            .position(|other| other.level <= page.level)
            .map_or(self.pages.len(), |offset| index + 1 + offset);
        index + 1..end
    }

    /// Walks `range`, opening and closing one list per level change.
    ///
    /// `base` is the level the walk starts from; every level above it that is
    /// opened is closed again at the end.
    pub fn outline(&self, range: Range<usize>, base: usize) -> Vec<OutlineEvent> {
        let mut events = Vec::new();
        let mut current = base;
        for index in range {
            let level = self.pages[index].level;
            if level > current {
                events.extend((current + 1..=level).map(OutlineEvent::Open));
            } else if level < current {
                events.extend((level.max(base) + 1..=current).rev().map(OutlineEvent::Close));
            }
            events.push(OutlineEvent::Item(index));
            current = level;
        }
        events.extend((base + 1..=current).rev().map(OutlineEvent::Close));
        events
    }
}

/// Name of the list macro for `level`.
pub fn toc_macro(level: usize) -> String {
    format!("__TOC_{level}__")
}

/// Name of the item macro for `level`.
pub fn toc_item_macro(level: usize) -> String {
    format!("__TOC_{level}_ITEM__")
}

/// Registers a page and defines the outline macros of its level, and of every
/// level above it, unless customized.
///
/// Skipped levels still open and close a list when rendered.
pub fn add_page(ctx: &mut Context, page: PageEntry) {
    let (open, close) = (&ctx.settings().open_delimiter, &ctx.settings().close_delimiter);
    let newline = format!("{open}{NEWLINE_MACRO}{close}");

    for level in 1..=page.level {
        let list = toc_macro(level);
        if !ctx.macros().contains(&list) {
            let value = format!("<ul>{newline}{}</ul>{newline}", marker(0));
            ctx.define(&list, &value);
        }
        let item = toc_item_macro(level);
        if !ctx.macros().contains(&item) {
            let value = format!("<li><a href=\"{}\">{}</a>{newline}", marker(0), marker(1));
            ctx.define(&item, &value);
        }
    }
    ctx.site.push(page);
}

/// Link from the page at `from` to the page at `to`.
fn link(ctx: &Context, from: &str, to: &str) -> String {
    let target = output_name(to, ctx.settings())
        .ok()
        .flatten()
        .unwrap_or_else(|| to.to_string());
    if target.starts_with('/') {
        target
    } else {
        format!("{}{}", root_path(from), target)
    }
}

/// Recomputes the navigation macros for the page at `index`.
pub fn set_links(ctx: &mut Context, index: usize) {
    for name in NAVIGATION_MACROS {
        ctx.undefine(name);
    }
    let Some(page) = ctx.site.get(index).cloned() else {
        return;
    };
    ctx.define("TITLE_CURRENT", &page.title);

    let navigation = ctx.site.navigation(index);
    let neighbours = [
        (navigation.up, "TITLE_UP", "LINK_UP"),
        (navigation.next, "TITLE_NEXT", "LINK_NEXT"),
        (navigation.prev, "TITLE_PREV", "LINK_PREV"),
    ];
    for (neighbour, title, link_name) in neighbours {
        if let Some(other) = neighbour.and_then(|i| ctx.site.get(i)).cloned() {
            let href = link(ctx, &page.path, &other.path);
            ctx.define(title, &other.title);
            ctx.define(link_name, &href);
        }
    }
}

/// Renders an outline of `range` with the `__TOC_n__` macros, relative to
/// the source being processed.
fn render(ctx: &mut Context, range: Range<usize>, base: usize) -> String {
    let from = ctx.source.clone().unwrap_or_default();
    let events = ctx.site.outline(range, base);
    let mut lists: Vec<String> = vec![String::new()];

    for event in events {
        match event {
            OutlineEvent::Open(_) => lists.push(String::new()),
            OutlineEvent::Item(index) => {
                let Some(page) = ctx.site.get(index).cloned() else {
                    continue;
                };
                let href = link(ctx, &from, &page.path);
                let item = call(ctx, &toc_item_macro(page.level), &[href, page.title]);
                if let Some(list) = lists.last_mut() {
                    list.push_str(&item);
                }
            }
            OutlineEvent::Close(level) => {
                let body = lists.pop().unwrap_or_default();
                let wrapped = call(ctx, &toc_macro(level), &[body]);
                if let Some(list) = lists.last_mut() {
                    list.push_str(&wrapped);
                }
            }
        }
    }

    let text = lists.concat();
    expand(ctx, &text)
}

/// Table of all registered pages.
pub fn sitemap(ctx: &mut Context) -> String {
    let all = 0..ctx.site.len();
    render(ctx, all, 0)
}

/// Table of the pages below the page being processed.
pub fn toc(ctx: &mut Context) -> String {
    match ctx.page {
        Some(index) => {
            let level = ctx.site.get(index).map_or(0, |page| page.level);
            let below = ctx.site.descendants(index);
            render(ctx, below, level)
        }
        None => sitemap(ctx),
    }
}
