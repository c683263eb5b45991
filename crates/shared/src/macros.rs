// crates/shared/src/macros.rs

/// Declares the tools of a toolbelt: their schemas (`TOOL_SCHEMAS`) and the
/// `Toolbelt` implementation that dispatches a tool name to its method.
///
/// Each parameter is marked `required` or `optional`; optional parameters are
/// left out of the schema's `required` list and the method supplies a default.
#[macro_export]
macro_rules! register_toolbelt {
    (
        $toolbelt_type:ty {
            tools: {
                $(
                    $name:literal => $method:ident {
                        description: $desc:literal,
                        params: [$($req:ident $param_name:literal: $param_type:literal => $param_desc:literal),* $(,)?]
                    }
                ),* $(,)?
            }
        }
    ) => {
        pub static TOOL_SCHEMAS: $crate::__private::Lazy<Vec<$crate::schemas::ToolSchema>> =
            $crate::__private::Lazy::new(|| vec![
                $(
                    $crate::schemas::ToolSchema {
                        name: $name,
                        description: $desc,
                        parameters: vec![
                            $(
                                $crate::schemas::ParameterSchema {
                                    name: $param_name,
                                    type_name: $param_type,
                                    description: $param_desc,
                                    required: $crate::__param_required!($req),
                                }
                            ),*
                        ],
                    }
                ),*
            ]);

        #[$crate::__private::async_trait]
        impl $crate::tools::Toolbelt for $toolbelt_type {
            fn name(&self) -> &'static str {
                stringify!($toolbelt_type)
            }

            fn schemas(&self) -> &'static [$crate::schemas::ToolSchema] {
                TOOL_SCHEMAS.as_slice()
            }

            async fn call(
                &self,
                tool: &str,
                args: &serde_json::Value,
            ) -> Option<anyhow::Result<serde_json::Value>> {
                match tool {
                    $($name => Some(self.$method(args).await),)*
                    _ => None,
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __param_required {
    (required) => {
        true
    };
    (optional) => {
        false
    };
}
