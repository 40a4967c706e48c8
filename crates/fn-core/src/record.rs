//! Note records as stored by the remote data store, and the mapping between
//! their flat numeric fields and `Anchor`.

use crate::anchor::{Anchor, Corners};
use crate::geometry::DiagramPoint;
use crate::id::{DiagramId, NoteId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decimal places kept for stored coordinates.
pub const COORD_PRECISION: i32 = 5;

pub mod fields {
    pub const ID: &str = "Id";
    pub const DIAGRAM_ID: &str = "FlowId__c";
    pub const TEXT: &str = "NoteText__c";
    pub const CREATED_DATE: &str = "CreatedDate";
    pub const TLX: &str = "TLX__c";
    pub const TLY: &str = "TLY__c";
    pub const TRX: &str = "TRX__c";
    pub const TRY: &str = "TRY__c";
    pub const BLX: &str = "BLX__c";
    pub const BLY: &str = "BLY__c";
    pub const BRX: &str = "BRX__c";
    pub const BRY: &str = "BRY__c";
    pub const CENTER_X: &str = "CenterX__c";
    pub const CENTER_Y: &str = "CenterY__c";
    pub const TOP: &str = "Top__c";
    pub const LEFT: &str = "Left__c";

    /// Every anchor-related field, in query order.
    pub const ANCHOR: [&str; 12] = [
        TLX, TLY, TRX, TRY, BLX, BLY, BRX, BRY, CENTER_X, CENTER_Y, TOP, LEFT,
    ];
}

/// A note record as returned by a query.
///
/// Every field is optional on the wire; a record missing its id is dropped
/// by the store rather than failing the whole result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    #[serde(rename = "Id", default)]
    pub id: Option<NoteId>,
    #[serde(rename = "FlowId__c", default)]
    pub diagram_id: Option<DiagramId>,
    #[serde(rename = "NoteText__c", default)]
    pub text: Option<String>,
    #[serde(rename = "CreatedDate", default)]
    pub created_date: Option<String>,
    #[serde(rename = "TLX__c", default)]
    pub tlx: Option<f64>,
    #[serde(rename = "TLY__c", default)]
    pub tly: Option<f64>,
    #[serde(rename = "TRX__c", default)]
    pub trx: Option<f64>,
    #[serde(rename = "TRY__c", default)]
    pub try_: Option<f64>,
    #[serde(rename = "BLX__c", default)]
    pub blx: Option<f64>,
    #[serde(rename = "BLY__c", default)]
    pub bly: Option<f64>,
    #[serde(rename = "BRX__c", default)]
    pub brx: Option<f64>,
    #[serde(rename = "BRY__c", default)]
    pub bry: Option<f64>,
    #[serde(rename = "CenterX__c", default)]
    pub center_x: Option<f64>,
    #[serde(rename = "CenterY__c", default)]
    pub center_y: Option<f64>,
    #[serde(rename = "Top__c", default)]
    pub top: Option<f64>,
    #[serde(rename = "Left__c", default)]
    pub left: Option<f64>,
}

fn pair(x: Option<f64>, y: Option<f64>) -> Option<DiagramPoint> {
    let p = DiagramPoint::new(x?, y?);
    p.is_finite().then_some(p)
}

impl NoteRecord {
    /// Rebuild the anchor verbatim from stored fields.
    ///
    /// Three corners are the minimum for a corner anchor. Otherwise a
    /// top/left pair (or a lone top-left corner) gives a point anchor with
    /// the default note size. `None` when nothing usable was stored.
    pub fn anchor(&self, default_width: f64, default_height: f64) -> Option<Anchor> {
        let tl = pair(self.tlx, self.tly);
        let tr = pair(self.trx, self.try_);
        let bl = pair(self.blx, self.bly);
        if let (Some(top_left), Some(top_right), Some(bottom_left)) = (tl, tr, bl) {
            return Some(Anchor::Corners(Corners {
                top_left,
                top_right,
                bottom_left,
                bottom_right: pair(self.brx, self.bry),
                center: pair(self.center_x, self.center_y),
            }));
        }
        let origin = tl.or_else(|| pair(self.left, self.top))?;
        Some(Anchor::Point {
            origin,
            width: default_width,
            height: default_height,
            captured_scale: None,
        })
    }
}

/// Flatten an anchor into record fields, rounded to storage precision.
pub fn anchor_fields(anchor: &Anchor) -> Map<String, Value> {
    let mut out = Map::new();
    let mut put = |name: &str, p: DiagramPoint, x_field: bool| {
        let p = p.rounded(COORD_PRECISION);
        out.insert(name.to_string(), Value::from(if x_field { p.x } else { p.y }));
    };
    match anchor {
        Anchor::Corners(c) => {
            put(fields::TLX, c.top_left, true);
            put(fields::TLY, c.top_left, false);
            put(fields::TRX, c.top_right, true);
            put(fields::TRY, c.top_right, false);
            put(fields::BLX, c.bottom_left, true);
            put(fields::BLY, c.bottom_left, false);
            if let Some(br) = c.bottom_right {
                put(fields::BRX, br, true);
                put(fields::BRY, br, false);
            }
            if let Some(center) = c.center {
                put(fields::CENTER_X, center, true);
                put(fields::CENTER_Y, center, false);
            }
        }
        Anchor::Point { origin, .. } => {
            put(fields::LEFT, *origin, true);
            put(fields::TOP, *origin, false);
        }
    }
    out
}

/// A note about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteDraft {
    pub diagram_id: DiagramId,
    pub text: String,
    pub anchor: Option<Anchor>,
}

impl NoteDraft {
    /// All fields of the create payload, before capability filtering.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert(
            fields::DIAGRAM_ID.to_string(),
            Value::from(self.diagram_id.as_str()),
        );
        out.insert(fields::TEXT.to_string(), Value::from(self.text.as_str()));
        if let Some(anchor) = &self.anchor {
            out.extend(anchor_fields(anchor));
        }
        out
    }
}
