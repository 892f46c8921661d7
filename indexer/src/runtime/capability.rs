//! Capability adapter
//!
//! The plugin object is owned by the host contract and exposes far more than
//! packaging needs. [`PluginCapability`] narrows it to the five accessors
//! read here, and [`describe_plugin`] turns those into a [`PluginMetadata`].
//!
//! Name, author, description and creation date are required by contract: a
//! failure reading any of them is a [`CapabilityError`] and aborts the run.
//! The icon reference is optional and every failure around it degrades to
//! "no icon".

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{DateTime, FixedOffset};
use plugin_abi::{AbiError, GetStringFn, NativeDateTime, PluginObject, PluginVtable, S_OK};
use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use thiserror::Error;

/// A plugin accessor broke its contract
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("{accessor} failed with HRESULT {hresult:#010x}")]
    Status { accessor: &'static str, hresult: i32 },

    #[error("{accessor} returned a null pointer")]
    NullPointer { accessor: &'static str },

    #[error("{accessor} returned malformed data: {source}")]
    Decode {
        accessor: &'static str,
        #[source]
        source: AbiError,
    },
}

/// Read accessors of a plugin object
pub trait PluginCapability {
    fn name(&self) -> Result<String, CapabilityError>;
    fn author(&self) -> Result<String, CapabilityError>;
    fn description(&self) -> Result<String, CapabilityError>;
    fn creation_date(&self) -> Result<DateTime<FixedOffset>, CapabilityError>;
    fn icon_reference(&self) -> Result<String, CapabilityError>;
}

/// Alternative icon: inline data or a location, never both
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlternativeIcon {
    /// Base64 payload, stored exactly as the plugin returned it
    InlineBase64(String),
    /// Normalized absolute URI
    Uri(String),
}

impl AlternativeIcon {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InlineBase64(data) => data,
            Self::Uri(uri) => uri,
        }
    }
}

/// Plugin identity as read through [`PluginCapability`]
#[derive(Debug, Clone, PartialEq)]
pub struct PluginMetadata {
    pub name: String,
    pub author: String,
    pub description: String,
    pub creation_date: DateTime<FixedOffset>,
    pub alternative_icon: Option<AlternativeIcon>,
}

/// Read every field this tool packages from `plugin`
pub fn describe_plugin<P>(plugin: &P) -> Result<PluginMetadata, CapabilityError>
where
    P: PluginCapability + ?Sized,
{
    let name = plugin.name()?;
    let author = plugin.author()?;
    let description = plugin.description()?;
    let creation_date = plugin.creation_date()?;

    let alternative_icon = match plugin.icon_reference() {
        Ok(reference) => classify_icon(&reference),
        Err(e) => {
            tracing::warn!("Error while retrieving plugin alternative icon data: {}", e);
            None
        }
    };

    Ok(PluginMetadata {
        name,
        author,
        description,
        creation_date,
        alternative_icon,
    })
}

/// Classify an icon reference string
///
/// Valid base64 wins over URI parsing, so a payload that happens to look like
/// a relative path is still kept as data.
pub fn classify_icon(reference: &str) -> Option<AlternativeIcon> {
    if reference.trim().is_empty() {
        return None;
    }

    if is_valid_base64(reference) {
        return Some(AlternativeIcon::InlineBase64(reference.to_string()));
    }

    match url::Url::parse(reference) {
        Ok(uri) => Some(AlternativeIcon::Uri(uri.to_string())),
        Err(e) => {
            tracing::debug!("Icon reference is neither base64 nor an absolute URI: {}", e);
            None
        }
    }
}

/// Standard alphabet, padding required, unused trailing bits ignored
const ICON_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical)
        .with_decode_allow_trailing_bits(true),
);

/// ASCII whitespace is ignored
fn is_valid_base64(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    !compact.is_empty() && ICON_BASE64.decode(compact.as_bytes()).is_ok()
}

/// A plugin object reached through its COM-style vtable
///
/// Holds one reference on the object for its lifetime and is bounded by the
/// lifetime of the module that produced it, so it can never outlive the code
/// its vtable points into.
pub struct ComPlugin<'m> {
    object: NonNull<PluginObject>,
    _module: PhantomData<&'m ()>,
}

impl<'m> ComPlugin<'m> {
    /// Wrap a raw plugin object
    ///
    /// Returns `None` for a null object or an object without a vtable.
    ///
    /// # Safety
    ///
    /// A non-null `object` must point to a live plugin object whose vtable
    /// starts with the [`PluginVtable`] slots, owned by `module`.
    pub unsafe fn from_raw<M>(object: *mut c_void, _module: &'m M) -> Option<Self> {
        let object = NonNull::new(object.cast::<PluginObject>())?;
        if object.as_ref().vtable.is_null() {
            return None;
        }

        let plugin = Self {
            object,
            _module: PhantomData,
        };
        (plugin.vtable().add_ref)(plugin.this());
        Some(plugin)
    }

    fn this(&self) -> *mut c_void {
        self.object.as_ptr().cast()
    }

    fn vtable(&self) -> &PluginVtable {
        // Non-null checked in `from_raw`.
        unsafe { &*self.object.as_ref().vtable }
    }

    fn read_string(&self, accessor: &'static str, slot: GetStringFn) -> Result<String, CapabilityError> {
        let mut out: *const u16 = ptr::null();
        let hresult = unsafe { slot(self.this(), &mut out) };
        if hresult != S_OK {
            return Err(CapabilityError::Status { accessor, hresult });
        }

        unsafe { plugin_abi::read_wide(out) }
            .map_err(|source| CapabilityError::Decode { accessor, source })
    }
}

impl PluginCapability for ComPlugin<'_> {
    fn name(&self) -> Result<String, CapabilityError> {
        self.read_string("GetPluginName", self.vtable().get_plugin_name)
    }

    fn author(&self) -> Result<String, CapabilityError> {
        self.read_string("GetPluginAuthor", self.vtable().get_plugin_author)
    }

    fn description(&self) -> Result<String, CapabilityError> {
        self.read_string("GetPluginDescription", self.vtable().get_plugin_description)
    }

    fn creation_date(&self) -> Result<DateTime<FixedOffset>, CapabilityError> {
        const ACCESSOR: &str = "GetPluginCreationDate";

        let mut out: *const NativeDateTime = ptr::null();
        let hresult = unsafe { (self.vtable().get_plugin_creation_date)(self.this(), &mut out) };
        if hresult != S_OK {
            return Err(CapabilityError::Status {
                accessor: ACCESSOR,
                hresult,
            });
        }
        if out.is_null() {
            return Err(CapabilityError::NullPointer { accessor: ACCESSOR });
        }

        // Copy out before any further call into the module.
        let raw = unsafe { *out };
        raw.to_fixed_offset().map_err(|source| CapabilityError::Decode {
            accessor: ACCESSOR,
            source,
        })
    }

    fn icon_reference(&self) -> Result<String, CapabilityError> {
        self.read_string("GetPluginAppIconUrl", self.vtable().get_plugin_app_icon_url)
    }
}

impl Drop for ComPlugin<'_> {
    fn drop(&mut self) {
        unsafe { (self.vtable().release)(self.this()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePlugin {
        icon: Result<&'static str, ()>,
        fail_name: bool,
    }

    impl FakePlugin {
        fn with_icon(icon: &'static str) -> Self {
            Self {
                icon: Ok(icon),
                fail_name: false,
            }
        }
    }

    impl PluginCapability for FakePlugin {
        fn name(&self) -> Result<String, CapabilityError> {
            if self.fail_name {
                return Err(CapabilityError::Status {
                    accessor: "GetPluginName",
                    hresult: 0x8000_4005_u32 as i32,
                });
            }
            Ok("Fake".to_string())
        }

        fn author(&self) -> Result<String, CapabilityError> {
            Ok(String::new())
        }

        fn description(&self) -> Result<String, CapabilityError> {
            Ok("Ünïcödé description".to_string())
        }

        fn creation_date(&self) -> Result<DateTime<FixedOffset>, CapabilityError> {
            Ok(DateTime::parse_from_rfc3339("2024-05-01T20:00:00+08:00").expect("valid"))
        }

        fn icon_reference(&self) -> Result<String, CapabilityError> {
            self.icon
                .map(str::to_string)
                .map_err(|_| CapabilityError::NullPointer {
                    accessor: "GetPluginAppIconUrl",
                })
        }
    }

    #[test]
    fn test_describe_plugin_fields() {
        let metadata = describe_plugin(&FakePlugin::with_icon("")).expect("describes");
        assert_eq!(metadata.name, "Fake");
        assert!(metadata.author.is_empty());
        assert_eq!(metadata.description, "Ünïcödé description");
        assert_eq!(metadata.creation_date.offset().local_minus_utc(), 8 * 3600);
        assert_eq!(metadata.alternative_icon, None);
    }

    #[test]
    fn test_base64_icon_kept_verbatim() {
        let metadata = describe_plugin(&FakePlugin::with_icon("iVBORw0KGgo=")).expect("describes");
        assert_eq!(
            metadata.alternative_icon,
            Some(AlternativeIcon::InlineBase64("iVBORw0KGgo=".to_string()))
        );
    }

    #[test]
    fn test_base64_with_whitespace_kept_verbatim() {
        assert_eq!(
            classify_icon("iVBO Rw0K\nGgo="),
            Some(AlternativeIcon::InlineBase64("iVBO Rw0K\nGgo=".to_string()))
        );
    }

    #[test]
    fn test_base64_with_trailing_bits_kept_verbatim() {
        assert_eq!(
            classify_icon("QR=="),
            Some(AlternativeIcon::InlineBase64("QR==".to_string()))
        );
        // Padding is still required
        assert_eq!(classify_icon("QR"), None);
    }

    #[test]
    fn test_uri_icon_normalized() {
        assert_eq!(
            classify_icon("HTTPS://Example.COM/icons/../icon.png"),
            Some(AlternativeIcon::Uri("https://example.com/icon.png".to_string()))
        );
    }

    #[test]
    fn test_relative_or_garbage_icon_dropped() {
        assert_eq!(classify_icon("icons/app.png"), None);
        assert_eq!(classify_icon("not an icon!"), None);
        assert_eq!(classify_icon("   "), None);
    }

    #[test]
    fn test_icon_error_is_absorbed() {
        let plugin = FakePlugin {
            icon: Err(()),
            fail_name: false,
        };
        let metadata = describe_plugin(&plugin).expect("icon errors are not fatal");
        assert_eq!(metadata.alternative_icon, None);
    }

    #[test]
    fn test_name_error_is_fatal() {
        let plugin = FakePlugin {
            icon: Ok(""),
            fail_name: true,
        };
        let error = describe_plugin(&plugin).expect_err("name is required");
        assert!(error.to_string().contains("GetPluginName"));
        assert!(error.to_string().contains("0x80004005"));
    }

    #[test]
    fn test_alternative_icon_as_str() {
        assert_eq!(AlternativeIcon::Uri("https://a/".to_string()).as_str(), "https://a/");
        assert_eq!(AlternativeIcon::InlineBase64("AA==".to_string()).as_str(), "AA==");
    }
}
