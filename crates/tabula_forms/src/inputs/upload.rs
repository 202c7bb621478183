use std::ops::Deref;
use std::rc::Rc;

use tabula_model::{AppContext, LoggedUser, ObjectStore, StorageConfig, S3_STORAGE};
use tracing::{info, warn};
use uuid::Uuid;

use crate::codec::FilesCodec;
use crate::control::{FieldControl, FieldSpec};
use crate::errors::{FormError, FormResult};
use crate::events::{EventType, WidgetEvent};
use crate::factory::{Markup, StandardFactory};
use crate::toolkit::{Primitive, Toolkit};
use crate::value::{FieldValue, SelectedFile, StorageRef, UploadedFile};

struct UploadInner {
    control: FieldControl,
    store: Option<Rc<dyn ObjectStore>>,
    config: StorageConfig,
    user: Option<LoggedUser>,
}

/// File list persisted to object storage.
///
/// The value is owned by the control; the uploader widget only shows
/// pending and uploaded items.
#[derive(Clone)]
pub struct FileUpload {
    inner: Rc<UploadInner>,
}

impl FileUpload {
    pub fn new(
        spec: FieldSpec,
        config: StorageConfig,
        multiple: bool,
        context: &AppContext,
        toolkit: Rc<dyn Toolkit>,
    ) -> FormResult<Self> {
        let factory = StandardFactory::new(Primitive::Uploader, Markup::File)
            .prop("multiple", multiple)
            .cache_only();
        let control = FieldControl::new(spec, Rc::new(FilesCodec), Rc::new(factory), toolkit)?;
        let upload = Self {
            inner: Rc::new(UploadInner {
                control,
                store: context.object_store.clone(),
                config,
                user: context.logged_user.clone(),
            }),
        };

        let weak = Rc::downgrade(&upload.inner);
        let on_selected = weak.clone();
        upload.inner.control.add_handler(
            EventType::Selected,
            Rc::new(move |event: &WidgetEvent| {
                let (WidgetEvent::Selected { files }, Some(inner)) = (event, on_selected.upgrade()) else {
                    return;
                };
                let upload = FileUpload { inner };
                if let Err(err) = upload.upload_files(files) {
                    warn!(error = %err, "upload aborted");
                }
            }),
        );
        upload.inner.control.add_handler(
            EventType::Removing,
            Rc::new(move |event: &WidgetEvent| {
                let (WidgetEvent::Removing { names }, Some(inner)) = (event, weak.upgrade()) else {
                    return;
                };
                let upload = FileUpload { inner };
                if let Some(name) = names.first() {
                    if let Err(err) = upload.remove_upload(name) {
                        warn!(file = %name, error = %err, "upload not removed");
                    }
                }
            }),
        );
        Ok(upload)
    }

    pub fn control(&self) -> &FieldControl {
        &self.inner.control
    }

    pub fn files(&self) -> FormResult<Vec<UploadedFile>> {
        Ok(match self.inner.control.value()? {
            FieldValue::Files(files) => files,
            _ => Vec::new(),
        })
    }

    fn store(&self) -> FormResult<&Rc<dyn ObjectStore>> {
        self.inner
            .store
            .as_ref()
            .ok_or_else(|| FormError::NotConfigured(self.name().to_string()))
    }

    fn bucket(&self) -> FormResult<String> {
        self.inner
            .config
            .bucket
            .clone()
            .or_else(|| self.inner.store.as_ref().and_then(|store| store.default_bucket()))
            .ok_or_else(|| FormError::NotConfigured(self.name().to_string()))
    }

    /// Storage key: `tenant/prefix/random-id/filename`.
    fn file_key(&self, file: &SelectedFile) -> FormResult<String> {
        let tenant = self
            .inner
            .user
            .as_ref()
            .map(|user| user.tenant_uid.as_str())
            .ok_or_else(|| FormError::NotConfigured(self.name().to_string()))?;
        Ok(format!(
            "{}/{}/{}/{}",
            tenant,
            self.inner.config.key_prefix,
            Uuid::new_v4(),
            file.name
        ))
    }

    /// Persists each selected file. Confirmed uploads are appended to the
    /// value; rejected ones are dropped from the widget's pending list.
    pub fn upload_files(&self, files: &[SelectedFile]) -> FormResult<Vec<UploadedFile>> {
        if self.inner.config.kind != S3_STORAGE {
            return Err(FormError::NotConfigured(self.name().to_string()));
        }
        let store = Rc::clone(self.store()?);
        let bucket = self.bucket()?;
        let mut value = self.files()?;
        let mut uploaded = Vec::new();
        for file in files {
            let key = self.file_key(file)?;
            if store.upload_file(&key, &file.raw, &bucket) {
                info!(key = %key, size = file.size, "uploaded file");
                let descriptor = UploadedFile {
                    name: file.name.clone(),
                    size: file.size,
                    mime_type: file.mime_type.clone(),
                    storage: StorageRef {
                        kind: S3_STORAGE.to_string(),
                        bucket: bucket.clone(),
                        key,
                    },
                };
                value.push(descriptor.clone());
                uploaded.push(descriptor);
            } else {
                warn!(key = %key, "upload rejected");
                self.inner
                    .control
                    .update_widgets(|widget| widget.remove_item(&file.name));
            }
        }
        self.inner.control.set_value(FieldValue::Files(value))?;
        Ok(uploaded)
    }

    /// Deletes an uploaded file from storage, then from the value and the
    /// widget. A failed storage delete leaves both untouched.
    pub fn remove_upload(&self, name: &str) -> FormResult<bool> {
        let mut value = self.files()?;
        let Some(index) = value.iter().position(|file| file.name == name) else {
            return Ok(false);
        };
        let storage = value[index].storage.clone();
        self.store()?
            .delete_files(&[storage.key.clone()], &storage.bucket)
            .map_err(|err| FormError::StorageOperation(err.to_string()))?;
        info!(key = %storage.key, "deleted upload");
        value.remove(index);
        self.inner.control.set_value(FieldValue::Files(value))?;
        self.inner
            .control
            .update_widgets(|widget| widget.remove_item(name));
        Ok(true)
    }
}

impl Deref for FileUpload {
    type Target = FieldControl;

    fn deref(&self) -> &FieldControl {
        &self.inner.control
    }
}
