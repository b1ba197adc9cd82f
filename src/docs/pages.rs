//! Documentation pages bundled into the binary.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub slug: &'static str,
    pub title: &'static str,
    pub source: &'static str,
}

pub const PAGES: &[Page] = &[
    Page {
        slug: "get-drafts",
        title: "Get drafts",
        source: include_str!("../../templates/api/get-drafts.md"),
    },
    Page {
        slug: "create-drafts",
        title: "Create drafts",
        source: include_str!("../../templates/api/create-drafts.md"),
    },
    Page {
        slug: "edit-draft",
        title: "Edit a draft",
        source: include_str!("../../templates/api/edit-draft.md"),
    },
    Page {
        slug: "delete-draft",
        title: "Delete a draft",
        source: include_str!("../../templates/api/delete-draft.md"),
    },
];

pub fn find(slug: &str) -> Option<&'static Page> {
    PAGES.iter().find(|page| page.slug == slug)
}
