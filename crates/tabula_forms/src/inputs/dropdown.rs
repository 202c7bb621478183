use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

use tabula_model::LookupOption;

use crate::codec::{OptionCodec, SelectMode};
use crate::control::{FieldControl, FieldSpec};
use crate::errors::FormResult;
use crate::factory::{DropdownFactory, WidgetFactory};
use crate::toolkit::{props, Toolkit};

/// Single or multi select over a held option list.
#[derive(Debug, Clone)]
pub struct Dropdown {
    control: FieldControl,
    options: Rc<RefCell<Vec<LookupOption>>>,
    mode: SelectMode,
}

impl Dropdown {
    pub fn new(
        spec: FieldSpec,
        options: Vec<LookupOption>,
        mode: SelectMode,
        toolkit: Rc<dyn Toolkit>,
    ) -> FormResult<Self> {
        let shared = Rc::new(RefCell::new(options));
        let factory = DropdownFactory::new(Rc::clone(&shared), mode);
        Self::with_factory(spec, shared, mode, Rc::new(factory), toolkit)
    }

    /// Options given as plain strings; each string is both text and id.
    pub fn from_strings<S: AsRef<str>>(
        spec: FieldSpec,
        options: &[S],
        mode: SelectMode,
        toolkit: Rc<dyn Toolkit>,
    ) -> FormResult<Self> {
        let options = options.iter().map(|s| LookupOption::plain(s.as_ref())).collect();
        Self::new(spec, options, mode, toolkit)
    }

    pub(crate) fn with_factory(
        spec: FieldSpec,
        options: Rc<RefCell<Vec<LookupOption>>>,
        mode: SelectMode,
        factory: Rc<dyn WidgetFactory>,
        toolkit: Rc<dyn Toolkit>,
    ) -> FormResult<Self> {
        let codec = OptionCodec::new(Rc::clone(&options), mode);
        let control = FieldControl::new(spec, Rc::new(codec), factory, toolkit)?;
        Ok(Self {
            control,
            options,
            mode,
        })
    }

    pub fn control(&self) -> &FieldControl {
        &self.control
    }

    pub fn mode(&self) -> SelectMode {
        self.mode
    }

    pub fn options(&self) -> Vec<LookupOption> {
        self.options.borrow().clone()
    }

    /// Replaces the option list, refreshing a live widget's data source.
    pub fn set_options(&self, options: Vec<LookupOption>) {
        *self.options.borrow_mut() = options.clone();
        self.control.update_widgets(|widget| {
            widget.set_property(props::DATA_SOURCE, options.clone().into());
        });
    }

    /// Inserts an option at `index` in the list and the live widget.
    pub fn insert_option(&self, option: LookupOption, index: usize) {
        {
            let mut options = self.options.borrow_mut();
            let at = index.min(options.len());
            options.insert(at, option.clone());
        }
        self.control.update_widgets(|widget| widget.add_item(option.clone(), index));
    }
}

impl Deref for Dropdown {
    type Target = FieldControl;

    fn deref(&self) -> &FieldControl {
        &self.control
    }
}
