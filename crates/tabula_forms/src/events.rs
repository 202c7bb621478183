use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::value::{FieldValue, SelectedFile, WidgetValue};

/// Events a widget can raise towards its owning control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Change,
    Open,
    Close,
    /// Click on a dropdown footer action.
    FooterClick,
    /// Files picked in an uploader.
    Selected,
    /// An uploaded file is being removed from an uploader.
    Removing,
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Change => "change",
            EventType::Open => "open",
            EventType::Close => "close",
            EventType::FooterClick => "footerClick",
            EventType::Selected => "selected",
            EventType::Removing => "removing",
        }
    }

    pub fn all_events() -> Vec<EventType> {
        vec![
            EventType::Change,
            EventType::Open,
            EventType::Close,
            EventType::FooterClick,
            EventType::Selected,
            EventType::Removing,
        ]
    }
}

/// Payload of a widget event.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    Change { value: WidgetValue },
    Open,
    Close,
    FooterClick { target: String },
    Selected { files: Vec<SelectedFile> },
    Removing { names: Vec<String> },
}

impl WidgetEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            WidgetEvent::Change { .. } => EventType::Change,
            WidgetEvent::Open => EventType::Open,
            WidgetEvent::Close => EventType::Close,
            WidgetEvent::FooterClick { .. } => EventType::FooterClick,
            WidgetEvent::Selected { .. } => EventType::Selected,
            WidgetEvent::Removing { .. } => EventType::Removing,
        }
    }

    pub fn change(value: WidgetValue) -> Self {
        WidgetEvent::Change { value }
    }
}

/// Handler registered on a widget; runs synchronously on the UI thread.
pub type EventHandler = Rc<dyn Fn(&WidgetEvent)>;

/// What a control reports to its change callback.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub name: String,
    /// `None` when the event carried no value.
    pub value: Option<FieldValue>,
}

pub type ChangeCallback = Rc<dyn Fn(&FieldChange)>;
