//! The in-memory data set tree.
//!
//! A [`DataSet`] maps group numbers to one or more repetitions of a [`Group`]
//! (the "group order"), and each group maps element numbers to a [`DataElement`].
//! An element holds either value buffers or nested data sets (sequence items).

use crate::buffer::{self, Buffer};
use crate::header::{ElementNumber, GroupNumber, Tag, VR};
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::collections::btree_map::{self, BTreeMap};
use std::convert::TryFrom;
use std::sync::Arc;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not load value of {}", tag))]
    LoadValue {
        tag: Tag,
        #[snafu(backtrace)]
        source: buffer::Error,
    },
    #[snafu(display("Element {} is a sequence, not a primitive value", tag))]
    NotPrimitive { tag: Tag, backtrace: Backtrace },
    #[snafu(display("Element {} with VR {} cannot be read as {}", tag, vr, requested))]
    UnexpectedVr {
        tag: Tag,
        vr: VR,
        requested: &'static str,
        backtrace: Backtrace,
    },
    #[snafu(display("Value {:?} of element {} is not a valid number", text, tag))]
    ParseNumber {
        tag: Tag,
        text: String,
        backtrace: Backtrace,
    },
    #[snafu(display("Value {} of element {} is out of range", value, tag))]
    NumberOutOfRange {
        tag: Tag,
        value: i64,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The content of a data element.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Primitive content. Encapsulated pixel data uses one buffer
    /// for the basic offset table followed by one buffer per fragment.
    Buffers(Vec<Buffer>),
    /// Sequence items.
    Items(Vec<DataSet>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataElement {
    pub vr: VR,
    pub value: Value,
}

impl DataElement {
    /// An element with a single value buffer.
    pub fn new(vr: VR, data: Vec<u8>) -> Self {
        DataElement {
            vr,
            value: Value::Buffers(vec![Buffer::new(data, vr.padding())]),
        }
    }

    /// An element made of the given buffers.
    pub fn from_buffers(vr: VR, buffers: Vec<Buffer>) -> Self {
        DataElement {
            vr,
            value: Value::Buffers(buffers),
        }
    }

    /// A sequence element.
    pub fn sequence(items: Vec<DataSet>) -> Self {
        DataElement {
            vr: VR::SQ,
            value: Value::Items(items),
        }
    }

    pub fn buffers(&self) -> Option<&[Buffer]> {
        match &self.value {
            Value::Buffers(b) => Some(b),
            Value::Items(_) => None,
        }
    }

    pub fn items(&self) -> Option<&[DataSet]> {
        match &self.value {
            Value::Items(items) => Some(items),
            Value::Buffers(_) => None,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<DataSet>> {
        match &mut self.value {
            Value::Items(items) => Some(items),
            Value::Buffers(_) => None,
        }
    }
}

/// One repetition of a group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    elements: BTreeMap<ElementNumber, DataElement>,
}

impl Group {
    pub fn new() -> Self {
        Group::default()
    }

    pub fn get(&self, element: ElementNumber) -> Option<&DataElement> {
        self.elements.get(&element)
    }

    pub fn get_mut(&mut self, element: ElementNumber) -> Option<&mut DataElement> {
        self.elements.get_mut(&element)
    }

    pub fn contains(&self, element: ElementNumber) -> bool {
        self.elements.contains_key(&element)
    }

    pub fn insert(&mut self, element: ElementNumber, value: DataElement) -> Option<DataElement> {
        self.elements.insert(element, value)
    }

    pub fn remove(&mut self, element: ElementNumber) -> Option<DataElement> {
        self.elements.remove(&element)
    }

    /// Elements in ascending element number order.
    pub fn iter(&self) -> btree_map::Iter<'_, ElementNumber, DataElement> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// A tree of data elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    groups: BTreeMap<GroupNumber, Vec<Group>>,
}

impl DataSet {
    pub fn new() -> Self {
        DataSet::default()
    }

    /// Whether the data set has no elements.
    pub fn is_empty(&self) -> bool {
        self.groups.values().flatten().all(Group::is_empty)
    }

    /// Total number of elements at this level.
    pub fn len(&self) -> usize {
        self.groups.values().flatten().map(Group::len).sum()
    }

    /// Groups in ascending order, each with its repetitions.
    pub fn groups(&self) -> impl Iterator<Item = (GroupNumber, &[Group])> + '_ {
        self.groups.iter().map(|(id, reps)| (*id, reps.as_slice()))
    }

    pub fn group(&self, group: GroupNumber, order: usize) -> Option<&Group> {
        self.groups.get(&group).and_then(|reps| reps.get(order))
    }

    /// Fetch an element from the first repetition of its group.
    pub fn get(&self, tag: Tag) -> Option<&DataElement> {
        self.get_ordered(tag.group(), 0, tag.element())
    }

    pub fn get_ordered(
        &self,
        group: GroupNumber,
        order: usize,
        element: ElementNumber,
    ) -> Option<&DataElement> {
        self.group(group, order).and_then(|g| g.get(element))
    }

    pub fn get_mut(&mut self, tag: Tag) -> Option<&mut DataElement> {
        self.groups
            .get_mut(&tag.group())
            .and_then(|reps| reps.first_mut())
            .and_then(|g| g.get_mut(tag.element()))
    }

    /// Insert an element in the first repetition of its group,
    /// returning the element it replaced.
    pub fn put(&mut self, tag: Tag, element: DataElement) -> Option<DataElement> {
        self.put_ordered(tag.group(), 0, tag.element(), element)
    }

    /// Insert an element in the given repetition of its group,
    /// creating empty repetitions before it if needed.
    pub fn put_ordered(
        &mut self,
        group: GroupNumber,
        order: usize,
        element: ElementNumber,
        value: DataElement,
    ) -> Option<DataElement> {
        let reps = self.groups.entry(group).or_default();
        if reps.len() <= order {
            reps.resize_with(order + 1, Group::default);
        }
        reps[order].insert(element, value)
    }

    /// Add an element read from a stream.
    /// It goes into the latest repetition of its group,
    /// unless that repetition already has the element,
    /// in which case a new repetition is opened.
    pub fn push_parsed(&mut self, tag: Tag, element: DataElement) {
        let reps = self.groups.entry(tag.group()).or_default();
        match reps.last_mut() {
            Some(last) if !last.contains(tag.element()) => {
                last.insert(tag.element(), element);
            }
            _ => {
                let mut group = Group::new();
                group.insert(tag.element(), element);
                reps.push(group);
            }
        }
    }

    pub fn remove(&mut self, tag: Tag) -> Option<DataElement> {
        self.groups
            .get_mut(&tag.group())
            .and_then(|reps| reps.first_mut())
            .and_then(|g| g.remove(tag.element()))
    }

    /// Remove every repetition of a group.
    pub fn remove_group(&mut self, group: GroupNumber) -> Option<Vec<Group>> {
        self.groups.remove(&group)
    }

    /// Insert all repetitions of a group, replacing any existing ones.
    pub fn put_group(&mut self, group: GroupNumber, reps: Vec<Group>) {
        self.groups.insert(group, reps);
    }

    pub fn buffers(&self, tag: Tag) -> Option<&[Buffer]> {
        self.get(tag).and_then(DataElement::buffers)
    }

    pub fn items(&self, tag: Tag) -> Option<&[DataSet]> {
        self.get(tag).and_then(DataElement::items)
    }

    /// Replace the buffers of an element.
    pub fn set_buffers(&mut self, tag: Tag, vr: VR, buffers: Vec<Buffer>) {
        self.put(tag, DataElement::from_buffers(vr, buffers));
    }

    /// The content of the first buffer of an element.
    pub fn bytes(&self, tag: Tag) -> Result<Option<Arc<[u8]>>> {
        let element = match self.get(tag) {
            Some(e) => e,
            None => return Ok(None),
        };
        let buffers = element.buffers().context(NotPrimitiveSnafu { tag })?;
        match buffers.first() {
            Some(b) => b.data().map(Some).context(LoadValueSnafu { tag }),
            None => Ok(Some(Arc::from(Vec::new()))),
        }
    }

    /// The text of an element, with trailing padding removed.
    pub fn string(&self, tag: Tag) -> Result<Option<String>> {
        let vr = match self.get(tag) {
            Some(e) => e.vr,
            None => return Ok(None),
        };
        ensure!(
            vr.is_text() || vr == VR::UI || vr == VR::UN,
            UnexpectedVrSnafu {
                tag,
                vr,
                requested: "text",
            }
        );
        let data = self.bytes(tag)?.unwrap_or_else(|| Arc::from(Vec::new()));
        let text = String::from_utf8_lossy(&data);
        Ok(Some(
            text.trim_end_matches(|c: char| c == ' ' || c == '\0').to_owned(),
        ))
    }

    /// All backslash separated values of a text element.
    pub fn strings(&self, tag: Tag) -> Result<Option<Vec<String>>> {
        Ok(self.string(tag)?.map(|s| {
            s.split('\\')
                .map(|v| v.trim_matches(|c: char| c == ' ' || c == '\0').to_owned())
                .collect()
        }))
    }

    /// The first value of a numeric element, as a signed integer.
    /// Binary integers (US, SS, UL, SL) and integer strings (IS)
    /// are supported.
    pub fn int(&self, tag: Tag) -> Result<Option<i64>> {
        let vr = match self.get(tag) {
            Some(e) => e.vr,
            None => return Ok(None),
        };
        let data = self.bytes(tag)?.unwrap_or_else(|| Arc::from(Vec::new()));
        let value = match vr {
            VR::US if data.len() >= 2 => i64::from(u16::from_le_bytes([data[0], data[1]])),
            VR::SS if data.len() >= 2 => i64::from(i16::from_le_bytes([data[0], data[1]])),
            VR::UL if data.len() >= 4 => {
                i64::from(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
            }
            VR::SL if data.len() >= 4 => {
                i64::from(i32::from_le_bytes([data[0], data[1], data[2], data[3]]))
            }
            VR::US | VR::SS | VR::UL | VR::SL => return Ok(None),
            VR::IS => {
                let values = self.strings(tag)?.unwrap_or_default();
                let first = values.first().map(String::as_str).unwrap_or("");
                if first.is_empty() {
                    return Ok(None);
                }
                let trimmed = first.trim_start_matches('+');
                trimmed
                    .parse::<i64>()
                    .ok()
                    .context(ParseNumberSnafu { tag, text: first })?
            }
            vr => {
                return UnexpectedVrSnafu {
                    tag,
                    vr,
                    requested: "integer",
                }
                .fail()
            }
        };
        Ok(Some(value))
    }

    /// The first value of a numeric element, as an unsigned integer.
    pub fn uint(&self, tag: Tag) -> Result<Option<u32>> {
        match self.int(tag)? {
            Some(value) => u32::try_from(value)
                .ok()
                .context(NumberOutOfRangeSnafu { tag, value })
                .map(Some),
            None => Ok(None),
        }
    }

    /// Set a text element, padding it to an even length.
    pub fn set_string(&mut self, tag: Tag, vr: VR, value: &str) {
        self.put(tag, DataElement::new(vr, value.as_bytes().to_vec()));
    }

    /// Set a single value integer element of type US, UL or IS.
    pub fn set_uint(&mut self, tag: Tag, vr: VR, value: u32) -> Result<()> {
        let data = match vr {
            VR::US => {
                let v = u16::try_from(value).ok().context(NumberOutOfRangeSnafu {
                    tag,
                    value: i64::from(value),
                })?;
                v.to_le_bytes().to_vec()
            }
            VR::UL => value.to_le_bytes().to_vec(),
            VR::IS => value.to_string().into_bytes(),
            vr => {
                return UnexpectedVrSnafu {
                    tag,
                    vr,
                    requested: "unsigned integer",
                }
                .fail()
            }
        };
        self.put(tag, DataElement::new(vr, data));
        Ok(())
    }

    /// Load every deferred buffer in the tree.
    pub fn load_all(&self) -> Result<()> {
        for (group, reps) in &self.groups {
            for rep in reps {
                for (element, e) in rep.iter() {
                    match &e.value {
                        Value::Buffers(buffers) => {
                            for b in buffers {
                                b.data().context(LoadValueSnafu {
                                    tag: Tag(*group, *element),
                                })?;
                            }
                        }
                        Value::Items(items) => {
                            for item in items {
                                item.load_all()?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags;

    #[test]
    fn typed_accessors() {
        let mut ds = DataSet::new();
        ds.set_uint(tags::ROWS, VR::US, 512).unwrap();
        ds.set_uint(tags::NUMBER_OF_FRAMES, VR::IS, 12).unwrap();
        ds.set_string(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "RGB");
        ds.set_string(tags::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.7");

        assert_eq!(ds.uint(tags::ROWS).unwrap(), Some(512));
        assert_eq!(ds.uint(tags::NUMBER_OF_FRAMES).unwrap(), Some(12));
        assert_eq!(
            ds.string(tags::PHOTOMETRIC_INTERPRETATION).unwrap().as_deref(),
            Some("RGB")
        );
        // odd UID padded with NUL, stripped on read
        assert_eq!(ds.bytes(tags::SOP_CLASS_UID).unwrap().unwrap().len(), 26);
        assert_eq!(
            ds.string(tags::SOP_CLASS_UID).unwrap().as_deref(),
            Some("1.2.840.10008.5.1.4.1.1.7")
        );
        assert_eq!(ds.uint(tags::COLUMNS).unwrap(), None);
        assert!(ds.set_uint(tags::ROWS, VR::US, 70_000).is_err());
        assert!(ds.uint(tags::PHOTOMETRIC_INTERPRETATION).is_err());
    }

    #[test]
    fn integer_strings() {
        let mut ds = DataSet::new();
        ds.set_string(tags::NUMBER_OF_FRAMES, VR::IS, " +3 ");
        assert_eq!(ds.int(tags::NUMBER_OF_FRAMES).unwrap(), Some(3));
        ds.set_string(tags::NUMBER_OF_FRAMES, VR::IS, "x");
        assert!(ds.int(tags::NUMBER_OF_FRAMES).is_err());
    }

    #[test]
    fn parsed_elements_open_group_repetitions() {
        let mut ds = DataSet::new();
        ds.push_parsed(Tag(0x0009, 0x0010), DataElement::new(VR::LO, b"ACME".to_vec()));
        ds.push_parsed(Tag(0x0009, 0x1001), DataElement::new(VR::US, vec![1, 0]));
        ds.push_parsed(Tag(0x0009, 0x0010), DataElement::new(VR::LO, b"OTHER ".to_vec()));

        let (_, reps) = ds.groups().next().unwrap();
        assert_eq!(reps.len(), 2);
        assert_eq!(reps[0].len(), 2);
        assert_eq!(reps[1].len(), 1);
        assert!(ds.get_ordered(0x0009, 1, 0x0010).is_some());
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn put_ordered_fills_repetitions() {
        let mut ds = DataSet::new();
        ds.put_ordered(0x0011, 2, 0x0001, DataElement::new(VR::US, vec![0, 0]));
        assert_eq!(ds.groups().next().unwrap().1.len(), 3);
        assert!(ds.get(Tag(0x0011, 0x0001)).is_none());
    }

    #[test]
    fn sequences() {
        let mut item = DataSet::new();
        item.set_string(tags::PATIENT_NAME, VR::PN, "Doe^John");
        let mut ds = DataSet::new();
        ds.put(Tag(0x0008, 0x1140), DataElement::sequence(vec![item.clone(), item]));
        assert_eq!(ds.items(Tag(0x0008, 0x1140)).unwrap().len(), 2);
        assert!(ds.bytes(Tag(0x0008, 0x1140)).is_err());
        assert!(ds.string(Tag(0x0008, 0x1140)).is_err());
    }
}
