use crate::configuration::GraphQLTarget;
use crate::configuration::OperationKind;

/// Build the document sent to a GraphQL write target.
///
/// `arguments` is the already serialized argument list, see [`super::to_arguments`].
pub(crate) fn mutation_document(target: &GraphQLTarget, arguments: &str) -> String {
    let call = |name: &str| {
        if arguments.is_empty() {
            name.to_string()
        } else {
            format!("{name}({arguments})")
        }
    };
    match target {
        GraphQLTarget::Legacy(name) => {
            format!("mutation {{ {} {{response message}} }}", call(name))
        }
        GraphQLTarget::Operation(operation) => {
            let keyword = match operation.kind {
                OperationKind::Query => "query",
                OperationKind::Mutation | OperationKind::Relation => "mutation",
            };
            let separator = match operation.kind {
                OperationKind::Relation => ",",
                _ => " ",
            };
            let fields = match operation.response_fields.as_deref() {
                Some(fields) if !fields.is_empty() => fields.join(separator),
                _ => operation.id_field.as_str().to_string(),
            };
            format!(
                "{keyword} {{ response: {} {{{fields}}} }}",
                call(&operation.method)
            )
        }
    }
}

/// Wrap a selection set into a query document.
pub(crate) fn selection_document(selection: &str) -> String {
    format!("query {{ {} }}", selection.trim())
}
