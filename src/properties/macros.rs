//! Property record generation.
//!
//! [`define_properties!`](crate::define_properties) turns a field list into
//! a plain struct plus the full [`PropertyRecord`](super::PropertyRecord)
//! machinery: typed getters/setters with change notification, an index
//! dispatcher, a statically built name table and compact map
//! (de)serialization. Declaration order fixes the property indices.

/// Maps a [`PropertyType`](super::PropertyType) variant name to its carrier
/// type. Internal to [`define_properties!`](crate::define_properties).
#[doc(hidden)]
#[macro_export]
macro_rules! property_carrier {
    (Bool) => { bool };
    (I8) => { i8 };
    (I16) => { i16 };
    (I32) => { i32 };
    (I64) => { i64 };
    (U8) => { u8 };
    (U16) => { u16 };
    (U32) => { u32 };
    (U64) => { u64 };
    (F32) => { f32 };
    (F64) => { f64 };
    (Vec2) => { glam::Vec2 };
    (Vec3) => { glam::Vec3 };
    (Vec4) => { glam::Vec4 };
    (IVec2) => { glam::IVec2 };
    (IVec3) => { glam::IVec3 };
    (IVec4) => { glam::IVec4 };
    (UVec2) => { glam::UVec2 };
    (UVec3) => { glam::UVec3 };
    (UVec4) => { glam::UVec4 };
    (Quat) => { glam::Quat };
    (Mat4) => { glam::Mat4 };
    (String) => { ::std::string::String };
    (String16) => { ::std::vec::Vec<u16> };
    (Path) => { ::std::path::PathBuf };
}

/// Defines a property record struct.
///
/// ```ignore
/// define_properties! {
///     /// Properties of the 2D transform filter.
///     pub struct TransformProps {
///         translation: Vec2 = glam::Vec2::ZERO,
///         scale: Vec2 = glam::Vec2::ONE,
///         rotation: F32 = 0.0,
///     }
/// }
/// ```
///
/// Each field names a [`PropertyType`](crate::properties::PropertyType)
/// variant; the carrier type is derived from it. The expansion provides
/// `translation()` / `set_translation(value, notify, notifier)` accessors, a
/// `Default` impl from the declared defaults and the `PropertyRecord` trait.
#[macro_export]
macro_rules! define_properties {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident : $kind:ident = $default:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $crate::property_carrier!($kind),
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default,)*
                }
            }
        }

        paste::paste! {
            #[allow(non_camel_case_types, dead_code, clippy::enum_variant_names)]
            #[repr(u32)]
            enum [<$name Index>] {
                $($field,)*
            }
        }

        impl $name {
            /// Property names in index order.
            pub const PROPERTY_NAMES: &'static [&'static str] = &[$(stringify!($field),)*];

            paste::paste! {
                $(
                    /// Stable index of this property within the record.
                    pub const [<$field:upper _INDEX>]: u32 =
                        [<$name Index>]::$field as u32;

                    #[inline]
                    #[must_use]
                    pub fn $field(&self) -> $crate::property_carrier!($kind) {
                        self.$field.clone()
                    }

                    /// Assigns the property; with `notify` set and a notifier
                    /// bound, announces the change with the serialized value.
                    pub fn [<set_ $field>](
                        &mut self,
                        value: $crate::property_carrier!($kind),
                        notify: bool,
                        notifier: Option<&$crate::properties::PropertyNotifier>,
                    ) {
                        self.$field = value;
                        if notify {
                            if let Some(notifier) = notifier {
                                let serialized = $crate::properties::PropertyValue::$kind(
                                    self.$field.clone(),
                                )
                                .serialize();
                                notifier.notify(Self::[<$field:upper _INDEX>], &serialized);
                            }
                        }
                    }
                )*
            }
        }

        impl $crate::properties::PropertyRecord for $name {
            fn property_count(&self) -> u32 {
                Self::PROPERTY_NAMES.len() as u32
            }

            fn property_desc(
                &self,
                name: &str,
            ) -> Option<(u32, $crate::properties::PropertyType)> {
                paste::paste! {
                    match name {
                        $(
                            stringify!($field) => Some((
                                Self::[<$field:upper _INDEX>],
                                $crate::properties::PropertyType::$kind,
                            )),
                        )*
                        _ => None,
                    }
                }
            }

            fn property_type(&self, index: u32) -> Option<$crate::properties::PropertyType> {
                paste::paste! {
                    match index {
                        $(
                            Self::[<$field:upper _INDEX>] =>
                                Some($crate::properties::PropertyType::$kind),
                        )*
                        _ => None,
                    }
                }
            }

            fn get_by_index(&self, index: u32) -> Option<$crate::properties::PropertyValue> {
                paste::paste! {
                    match index {
                        $(
                            Self::[<$field:upper _INDEX>] => Some(
                                $crate::properties::PropertyValue::$kind(self.$field.clone()),
                            ),
                        )*
                        _ => None,
                    }
                }
            }

            fn set_by_index(
                &mut self,
                index: u32,
                value: &$crate::properties::PropertyValue,
                notify: bool,
                notifier: Option<&$crate::properties::PropertyNotifier>,
            ) -> bool {
                paste::paste! {
                    match index {
                        $(
                            Self::[<$field:upper _INDEX>] => {
                                if let $crate::properties::PropertyValue::$kind(v) = value {
                                    self.[<set_ $field>](v.clone(), notify, notifier);
                                    true
                                } else {
                                    log::error!(
                                        concat!(
                                            stringify!($name),
                                            ": type mismatch writing `",
                                            stringify!($field),
                                            "`: got {:?}"
                                        ),
                                        value.kind()
                                    );
                                    false
                                }
                            }
                        )*
                        _ => {
                            log::error!(
                                concat!(stringify!($name), ": property index {} out of range"),
                                index
                            );
                            false
                        }
                    }
                }
            }

            fn set_serialized(
                &mut self,
                index: u32,
                serialized: &str,
                notify: bool,
                notifier: Option<&$crate::properties::PropertyNotifier>,
            ) -> bool {
                let Some(kind) = self.property_type(index) else {
                    log::error!(
                        concat!(stringify!($name), ": property index {} out of range"),
                        index
                    );
                    return false;
                };
                match $crate::properties::PropertyValue::parse(kind, serialized) {
                    Some(value) => self.set_by_index(index, &value, notify, notifier),
                    None => {
                        log::error!(
                            concat!(stringify!($name), ": failed to parse `{}` as {:?}"),
                            serialized,
                            kind
                        );
                        false
                    }
                }
            }

            fn serialize(&self) -> String {
                let mut out = String::from("{ ");
                let mut first = true;
                $(
                    {
                        if !first {
                            out.push_str(", ");
                        }
                        first = false;
                        out.push_str(stringify!($field));
                        out.push_str(": ");
                        out.push_str(
                            &$crate::properties::PropertyValue::$kind(self.$field.clone())
                                .serialize(),
                        );
                    }
                )*
                let _ = first;
                out.push_str(" }");
                out
            }

            fn deserialize(
                &mut self,
                serialized: &str,
                notify: bool,
                notifier: Option<&$crate::properties::PropertyNotifier>,
            ) {
                let Some(entries) = $crate::properties::parse_property_map(serialized) else {
                    log::error!(
                        concat!(stringify!($name), ": malformed property map: {}"),
                        serialized
                    );
                    return;
                };
                for (name, value) in entries {
                    match self.property_desc(name) {
                        Some((index, _)) => {
                            self.set_serialized(index, value, notify, notifier);
                        }
                        None => {
                            log::warn!(
                                concat!(stringify!($name), ": unknown property `{}`"),
                                name
                            );
                        }
                    }
                }
            }

            fn notify_property_change(
                &self,
                index: u32,
                notifier: &$crate::properties::PropertyNotifier,
            ) {
                if let Some(value) = self.get_by_index(index) {
                    notifier.notify(index, &value.serialize());
                }
            }
        }
    };
}
