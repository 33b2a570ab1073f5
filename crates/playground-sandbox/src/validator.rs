//! Structural validator for playground snippets.
//!
//! Parses pre-sanitized code with `oxc_parser` and walks the tree, applying
//! the [`WhitelistPolicy`] to every node. The walk never mutates the tree
//! and never stops at the first violation — all diagnostics for a submission
//! are collected and returned together.
//!
//! The validator is name-based on purpose: it polices known global-ish names
//! and the approved namespace chain, but performs no scope or type analysis,
//! so a local binding that happens to shadow a denied name is out of its
//! reach. The runtime layer compensates by stripping the isolate of anything
//! a smuggled name could do (see [`crate::executor`]).

use std::fmt;

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_diagnostics::OxcDiagnostic;
use oxc_parser::{ParseOptions, Parser};
use oxc_span::{GetSpan, SourceType, Span};

use crate::policy::WhitelistPolicy;

/// First line of the synthetic wrapper. Wrapping the snippet as an async
/// function body legalizes top-level `return` and `await` without changing
/// its semantics.
const WRAPPER_HEAD: &str = "async function __snippet__() {";

/// A single policy or parse violation, positioned in the submitted source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    /// What was not allowed.
    pub message: String,
    /// 1-based line in the submitted (unwrapped) source, when known.
    pub line: Option<usize>,
    /// 0-based column, when known.
    pub column: Option<usize>,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "Line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Result of validating one pre-sanitized submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Whether the snippet may be executed.
    pub accepted: bool,
    /// The code to hand to the runner; empty when rejected.
    pub sanitized_code: String,
    /// Everything the walker objected to, in discovery order.
    pub diagnostics: Vec<ValidationDiagnostic>,
}

/// Render diagnostics the way the playground displays them, one per line.
pub fn format_diagnostics(diagnostics: &[ValidationDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validate pre-sanitized code against the whitelist policy.
///
/// The code is parsed as the body of a synthetic async function; reported
/// line numbers are shifted back to the submitted source (the wrapper adds
/// exactly one leading line). Parse failures become a single diagnostic;
/// policy violations accumulate. Running this twice on the same input yields
/// identical outcomes — there is no hidden state.
pub fn validate(presanitized: &str, policy: &WhitelistPolicy) -> ValidationOutcome {
    let wrapped = format!("{WRAPPER_HEAD}\n{presanitized}\n}}");

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, &wrapped, SourceType::mjs())
        .with_options(ParseOptions {
            // keep the tree in the shape the walker expects: no
            // ParenthesizedExpression nodes
            preserve_parens: false,
            ..ParseOptions::default()
        })
        .parse();

    if ret.panicked || !ret.errors.is_empty() {
        let diagnostic = ret
            .errors
            .first()
            .map(|error| parse_diagnostic(error, &wrapped))
            .unwrap_or_else(|| ValidationDiagnostic {
                message: "code could not be parsed".into(),
                line: None,
                column: None,
            });
        tracing::debug!(message = %diagnostic.message, "submission rejected: parse failure");
        return ValidationOutcome {
            accepted: false,
            sanitized_code: String::new(),
            diagnostics: vec![diagnostic],
        };
    }

    let mut walker = PolicyWalker {
        policy,
        source: &wrapped,
        diagnostics: Vec::new(),
    };
    if let Some(Statement::FunctionDeclaration(wrapper)) = ret.program.body.first() {
        if let Some(body) = &wrapper.body {
            for statement in &body.statements {
                walker.walk_statement(statement);
            }
        }
    }
    // A snippet that closes the wrapper's brace early leaves trailing
    // top-level statements behind; they are user code too.
    for statement in ret.program.body.iter().skip(1) {
        walker.walk_statement(statement);
    }

    if walker.diagnostics.is_empty() {
        ValidationOutcome {
            accepted: true,
            sanitized_code: presanitized.to_string(),
            diagnostics: Vec::new(),
        }
    } else {
        tracing::debug!(
            violations = walker.diagnostics.len(),
            "submission rejected: policy violations"
        );
        ValidationOutcome {
            accepted: false,
            sanitized_code: String::new(),
            diagnostics: walker.diagnostics,
        }
    }
}

/// Convert a parser error into a positioned diagnostic.
fn parse_diagnostic(error: &OxcDiagnostic, wrapped: &str) -> ValidationDiagnostic {
    let offset = error
        .labels
        .as_ref()
        .and_then(|labels| labels.first())
        .map(|label| label.offset());
    match offset {
        Some(offset) => {
            let (line, column) = line_column(wrapped, offset);
            ValidationDiagnostic {
                message: error.to_string(),
                line: adjust_line(line),
                column: Some(column),
            }
        }
        None => ValidationDiagnostic {
            message: error.to_string(),
            line: None,
            column: None,
        },
    }
}

/// 1-based line and 0-based column of a byte offset in the wrapped source.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let clamped = offset.min(source.len());
    let prefix = source.get(..clamped).unwrap_or(source);
    let line = prefix.bytes().filter(|&b| b == b'\n').count() + 1;
    let line_start = prefix.rfind('\n').map_or(0, |i| i + 1);
    (line, clamped - line_start)
}

/// Shift a wrapped-source line back to the submitted source. Line 1 is the
/// synthetic wrapper itself.
fn adjust_line(wrapped_line: usize) -> Option<usize> {
    wrapped_line.checked_sub(1).filter(|line| *line > 0)
}

/// Resolvable property name of a member access: a static identifier, or a
/// string literal in computed form. Anything dynamic resolves to `None` and
/// is left to the expression walk.
fn member_property_name(member: &MemberExpression<'_>) -> Option<String> {
    match member {
        MemberExpression::StaticMemberExpression(expr) => Some(expr.property.name.to_string()),
        MemberExpression::ComputedMemberExpression(expr) => match &expr.expression {
            Expression::StringLiteral(lit) => Some(lit.value.to_string()),
            _ => None,
        },
        MemberExpression::PrivateFieldExpression(_) => None,
    }
}

/// The object side of any member access form.
fn member_object<'b, 'a>(member: &'b MemberExpression<'a>) -> &'b Expression<'a> {
    match member {
        MemberExpression::StaticMemberExpression(expr) => &expr.object,
        MemberExpression::ComputedMemberExpression(expr) => &expr.object,
        MemberExpression::PrivateFieldExpression(expr) => &expr.object,
    }
}

/// ESTree-style category for statement kinds the whitelist does not name;
/// reported verbatim in the diagnostic.
fn statement_fallback_category(statement: &Statement<'_>) -> &'static str {
    match statement {
        Statement::ImportDeclaration(_) => "ImportDeclaration",
        Statement::ExportNamedDeclaration(_) => "ExportNamedDeclaration",
        Statement::ExportDefaultDeclaration(_) => "ExportDefaultDeclaration",
        Statement::ExportAllDeclaration(_) => "ExportAllDeclaration",
        _ => "UnknownStatement",
    }
}

/// Recursive walker that applies the policy to every node and accumulates
/// diagnostics. Subtrees whose own category is disallowed are not descended
/// into; sibling subtrees are always still walked.
struct PolicyWalker<'a> {
    policy: &'a WhitelistPolicy,
    source: &'a str,
    diagnostics: Vec<ValidationDiagnostic>,
}

impl<'a> PolicyWalker<'a> {
    fn report(&mut self, span: Span, message: String) {
        let (line, column) = line_column(self.source, span.start as usize);
        self.diagnostics.push(ValidationDiagnostic {
            message,
            line: adjust_line(line),
            column: Some(column),
        });
    }

    /// Category gate. Returns false (and reports) when the node kind is not
    /// permitted; the caller must then skip the subtree.
    fn category_allowed(&mut self, category: &'static str, span: Span) -> bool {
        if self.policy.allowed_node_categories.contains(category) {
            true
        } else {
            self.report(span, format!("Disallowed statement type: {category}"));
            false
        }
    }

    /// Bare identifier rule: allowed call names and namespace roots pass
    /// silently, denied names are reported, everything else is a local name
    /// the validator does not police.
    fn check_identifier(&mut self, name: &str, span: Span) {
        if self.policy.allowed_call_names.contains(name) {
            return;
        }
        if self.policy.allowed_namespaces.contains_key(name) {
            return;
        }
        if self.policy.denied_identifiers.contains(name) {
            self.report(span, format!("Identifier '{name}' is not allowed"));
        }
    }

    fn walk_identifier(&mut self, name: &str, span: Span) {
        if self.category_allowed("Identifier", span) {
            self.check_identifier(name, span);
        }
    }

    // --- Statements ---

    fn walk_statement(&mut self, statement: &Statement<'a>) {
        match statement {
            Statement::BlockStatement(block) => self.walk_block(block),
            Statement::ExpressionStatement(stmt) => {
                if self.category_allowed("ExpressionStatement", stmt.span) {
                    self.walk_expression(&stmt.expression);
                }
            }
            Statement::VariableDeclaration(decl) => self.walk_variable_declaration(decl),
            Statement::FunctionDeclaration(func) => {
                if self.category_allowed("FunctionDeclaration", func.span) {
                    self.walk_function(func);
                }
            }
            Statement::ReturnStatement(stmt) => {
                if self.category_allowed("ReturnStatement", stmt.span) {
                    if let Some(argument) = &stmt.argument {
                        self.walk_expression(argument);
                    }
                }
            }
            Statement::IfStatement(stmt) => {
                if self.category_allowed("IfStatement", stmt.span) {
                    self.walk_expression(&stmt.test);
                    self.walk_statement(&stmt.consequent);
                    if let Some(alternate) = &stmt.alternate {
                        self.walk_statement(alternate);
                    }
                }
            }
            Statement::TryStatement(stmt) => {
                if self.category_allowed("TryStatement", stmt.span) {
                    self.walk_block(&stmt.block);
                    if let Some(handler) = &stmt.handler {
                        if self.category_allowed("CatchClause", handler.span) {
                            if let Some(param) = &handler.param {
                                self.walk_binding_pattern(&param.pattern);
                            }
                            self.walk_block(&handler.body);
                        }
                    }
                    if let Some(finalizer) = &stmt.finalizer {
                        self.walk_block(finalizer);
                    }
                }
            }
            Statement::ThrowStatement(stmt) => {
                if self.category_allowed("ThrowStatement", stmt.span) {
                    self.walk_expression(&stmt.argument);
                }
            }
            Statement::ForStatement(stmt) => {
                if self.category_allowed("ForStatement", stmt.span) {
                    if let Some(init) = &stmt.init {
                        match init {
                            ForStatementInit::VariableDeclaration(decl) => {
                                self.walk_variable_declaration(decl);
                            }
                            other => {
                                if let Some(expression) = other.as_expression() {
                                    self.walk_expression(expression);
                                }
                            }
                        }
                    }
                    if let Some(test) = &stmt.test {
                        self.walk_expression(test);
                    }
                    if let Some(update) = &stmt.update {
                        self.walk_expression(update);
                    }
                    self.walk_statement(&stmt.body);
                }
            }
            Statement::ForInStatement(stmt) => {
                if self.category_allowed("ForInStatement", stmt.span) {
                    self.walk_for_target(&stmt.left);
                    self.walk_expression(&stmt.right);
                    self.walk_statement(&stmt.body);
                }
            }
            Statement::ForOfStatement(stmt) => {
                if self.category_allowed("ForOfStatement", stmt.span) {
                    self.walk_for_target(&stmt.left);
                    self.walk_expression(&stmt.right);
                    self.walk_statement(&stmt.body);
                }
            }
            Statement::WhileStatement(stmt) => {
                if self.category_allowed("WhileStatement", stmt.span) {
                    self.walk_expression(&stmt.test);
                    self.walk_statement(&stmt.body);
                }
            }
            Statement::DoWhileStatement(stmt) => {
                if self.category_allowed("DoWhileStatement", stmt.span) {
                    self.walk_statement(&stmt.body);
                    self.walk_expression(&stmt.test);
                }
            }
            Statement::BreakStatement(stmt) => {
                self.category_allowed("BreakStatement", stmt.span);
            }
            Statement::ContinueStatement(stmt) => {
                self.category_allowed("ContinueStatement", stmt.span);
            }
            Statement::SwitchStatement(stmt) => {
                if self.category_allowed("SwitchStatement", stmt.span) {
                    self.walk_expression(&stmt.discriminant);
                    for case in &stmt.cases {
                        if self.category_allowed("SwitchCase", case.span) {
                            if let Some(test) = &case.test {
                                self.walk_expression(test);
                            }
                            for consequent in &case.consequent {
                                self.walk_statement(consequent);
                            }
                        }
                    }
                }
            }
            Statement::ClassDeclaration(stmt) => {
                self.category_allowed("ClassDeclaration", stmt.span);
            }
            Statement::LabeledStatement(stmt) => {
                self.category_allowed("LabeledStatement", stmt.span);
            }
            Statement::WithStatement(stmt) => {
                self.category_allowed("WithStatement", stmt.span);
            }
            Statement::DebuggerStatement(stmt) => {
                self.category_allowed("DebuggerStatement", stmt.span);
            }
            Statement::EmptyStatement(stmt) => {
                self.category_allowed("EmptyStatement", stmt.span);
            }
            other => {
                self.report(
                    other.span(),
                    format!(
                        "Disallowed statement type: {}",
                        statement_fallback_category(other)
                    ),
                );
            }
        }
    }

    fn walk_block(&mut self, block: &BlockStatement<'a>) {
        if self.category_allowed("BlockStatement", block.span) {
            for statement in &block.body {
                self.walk_statement(statement);
            }
        }
    }

    fn walk_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        if !self.category_allowed("VariableDeclaration", decl.span) {
            return;
        }
        for declarator in &decl.declarations {
            if self.category_allowed("VariableDeclarator", declarator.span) {
                self.walk_binding_pattern(&declarator.id);
                if let Some(init) = &declarator.init {
                    self.walk_expression(init);
                }
            }
        }
    }

    fn walk_for_target(&mut self, left: &ForStatementLeft<'a>) {
        match left {
            ForStatementLeft::VariableDeclaration(decl) => self.walk_variable_declaration(decl),
            other => {
                if let Some(target) = other.as_assignment_target() {
                    self.walk_assignment_target(target);
                }
            }
        }
    }

    // --- Functions and patterns ---

    fn walk_function(&mut self, func: &Function<'a>) {
        for param in &func.params.items {
            self.walk_binding_pattern(&param.pattern);
        }
        if let Some(rest) = &func.params.rest {
            if self.category_allowed("RestElement", rest.span) {
                self.walk_binding_pattern(&rest.argument);
            }
        }
        if let Some(body) = &func.body {
            if self.category_allowed("BlockStatement", body.span) {
                for statement in &body.statements {
                    self.walk_statement(statement);
                }
            }
        }
    }

    fn walk_arrow(&mut self, arrow: &ArrowFunctionExpression<'a>) {
        if !self.category_allowed("ArrowFunctionExpression", arrow.span) {
            return;
        }
        for param in &arrow.params.items {
            self.walk_binding_pattern(&param.pattern);
        }
        if let Some(rest) = &arrow.params.rest {
            if self.category_allowed("RestElement", rest.span) {
                self.walk_binding_pattern(&rest.argument);
            }
        }
        if arrow.expression {
            // concise body: a single implicit-return expression
            if let Some(Statement::ExpressionStatement(stmt)) = arrow.body.statements.first() {
                self.walk_expression(&stmt.expression);
            }
        } else if self.category_allowed("BlockStatement", arrow.body.span) {
            for statement in &arrow.body.statements {
                self.walk_statement(statement);
            }
        }
    }

    fn walk_binding_pattern(&mut self, pattern: &BindingPattern<'a>) {
        match &pattern.kind {
            BindingPatternKind::BindingIdentifier(ident) => {
                self.walk_identifier(ident.name.as_str(), ident.span);
            }
            BindingPatternKind::ObjectPattern(object) => {
                if self.category_allowed("ObjectPattern", object.span) {
                    for property in &object.properties {
                        if self.category_allowed("Property", property.span) {
                            self.walk_property_key(&property.key);
                            self.walk_binding_pattern(&property.value);
                        }
                    }
                    if let Some(rest) = &object.rest {
                        if self.category_allowed("RestElement", rest.span) {
                            self.walk_binding_pattern(&rest.argument);
                        }
                    }
                }
            }
            BindingPatternKind::ArrayPattern(array) => {
                if self.category_allowed("ArrayPattern", array.span) {
                    for element in array.elements.iter().flatten() {
                        self.walk_binding_pattern(element);
                    }
                    if let Some(rest) = &array.rest {
                        if self.category_allowed("RestElement", rest.span) {
                            self.walk_binding_pattern(&rest.argument);
                        }
                    }
                }
            }
            BindingPatternKind::AssignmentPattern(assignment) => {
                if self.category_allowed("AssignmentPattern", assignment.span) {
                    self.walk_binding_pattern(&assignment.left);
                    self.walk_expression(&assignment.right);
                }
            }
        }
    }

    fn walk_property_key(&mut self, key: &PropertyKey<'a>) {
        match key {
            PropertyKey::StaticIdentifier(ident) => {
                self.walk_identifier(ident.name.as_str(), ident.span);
            }
            PropertyKey::PrivateIdentifier(ident) => {
                self.category_allowed("PrivateIdentifier", ident.span);
            }
            other => {
                if let Some(expression) = other.as_expression() {
                    self.walk_expression(expression);
                }
            }
        }
    }

    // --- Expressions ---

    fn walk_expression(&mut self, expression: &Expression<'a>) {
        match expression {
            Expression::Identifier(ident) => {
                self.walk_identifier(ident.name.as_str(), ident.span);
            }
            Expression::BooleanLiteral(lit) => {
                self.category_allowed("Literal", lit.span);
            }
            Expression::NullLiteral(lit) => {
                self.category_allowed("Literal", lit.span);
            }
            Expression::NumericLiteral(lit) => {
                self.category_allowed("Literal", lit.span);
            }
            Expression::BigIntLiteral(lit) => {
                self.category_allowed("Literal", lit.span);
            }
            Expression::RegExpLiteral(lit) => {
                self.category_allowed("Literal", lit.span);
            }
            Expression::StringLiteral(lit) => {
                self.category_allowed("Literal", lit.span);
            }
            Expression::TemplateLiteral(template) => self.walk_template_literal(template),
            Expression::TaggedTemplateExpression(tagged) => {
                self.category_allowed("TaggedTemplateExpression", tagged.span);
            }
            Expression::ArrayExpression(array) => {
                if self.category_allowed("ArrayExpression", array.span) {
                    for element in &array.elements {
                        match element {
                            ArrayExpressionElement::SpreadElement(spread) => {
                                self.walk_spread(spread);
                            }
                            ArrayExpressionElement::Elision(_) => {}
                            other => {
                                if let Some(expression) = other.as_expression() {
                                    self.walk_expression(expression);
                                }
                            }
                        }
                    }
                }
            }
            Expression::ObjectExpression(object) => {
                if self.category_allowed("ObjectExpression", object.span) {
                    for property in &object.properties {
                        match property {
                            ObjectPropertyKind::ObjectProperty(property) => {
                                if self.category_allowed("Property", property.span) {
                                    self.walk_property_key(&property.key);
                                    self.walk_expression(&property.value);
                                }
                            }
                            ObjectPropertyKind::SpreadProperty(spread) => {
                                self.walk_spread(spread);
                            }
                        }
                    }
                }
            }
            Expression::FunctionExpression(func) => {
                if self.category_allowed("FunctionExpression", func.span) {
                    self.walk_function(func);
                }
            }
            Expression::ArrowFunctionExpression(arrow) => self.walk_arrow(arrow),
            Expression::CallExpression(call) => self.walk_call(call),
            Expression::NewExpression(new_expr) => self.walk_new(new_expr),
            Expression::StaticMemberExpression(_)
            | Expression::ComputedMemberExpression(_)
            | Expression::PrivateFieldExpression(_) => {
                if let Some(member) = expression.as_member_expression() {
                    self.walk_member_expression(member);
                }
            }
            Expression::AwaitExpression(await_expr) => {
                if self.category_allowed("AwaitExpression", await_expr.span) {
                    self.walk_expression(&await_expr.argument);
                }
            }
            Expression::UnaryExpression(unary) => {
                if self.category_allowed("UnaryExpression", unary.span) {
                    self.walk_expression(&unary.argument);
                }
            }
            Expression::UpdateExpression(update) => {
                if self.category_allowed("UpdateExpression", update.span) {
                    self.walk_simple_assignment_target(&update.argument);
                }
            }
            Expression::BinaryExpression(binary) => {
                if self.category_allowed("BinaryExpression", binary.span) {
                    self.walk_expression(&binary.left);
                    self.walk_expression(&binary.right);
                }
            }
            Expression::LogicalExpression(logical) => {
                if self.category_allowed("LogicalExpression", logical.span) {
                    self.walk_expression(&logical.left);
                    self.walk_expression(&logical.right);
                }
            }
            Expression::ConditionalExpression(conditional) => {
                if self.category_allowed("ConditionalExpression", conditional.span) {
                    self.walk_expression(&conditional.test);
                    self.walk_expression(&conditional.consequent);
                    self.walk_expression(&conditional.alternate);
                }
            }
            Expression::AssignmentExpression(assignment) => {
                if self.category_allowed("AssignmentExpression", assignment.span) {
                    self.walk_assignment_target(&assignment.left);
                    self.walk_expression(&assignment.right);
                }
            }
            Expression::SequenceExpression(sequence) => {
                if self.category_allowed("SequenceExpression", sequence.span) {
                    for expression in &sequence.expressions {
                        self.walk_expression(expression);
                    }
                }
            }
            Expression::ChainExpression(chain) => {
                if self.category_allowed("ChainExpression", chain.span) {
                    match &chain.expression {
                        ChainElement::CallExpression(call) => self.walk_call(call),
                        other => {
                            if let Some(member) = other.as_member_expression() {
                                self.walk_member_expression(member);
                            }
                        }
                    }
                }
            }
            Expression::ThisExpression(this) => {
                self.category_allowed("ThisExpression", this.span);
            }
            Expression::ImportExpression(import) => {
                self.category_allowed("ImportExpression", import.span);
            }
            Expression::MetaProperty(meta) => {
                self.category_allowed("MetaProperty", meta.span);
            }
            Expression::YieldExpression(yield_expr) => {
                self.category_allowed("YieldExpression", yield_expr.span);
            }
            Expression::ClassExpression(class) => {
                self.category_allowed("ClassExpression", class.span);
            }
            Expression::Super(super_expr) => {
                self.category_allowed("Super", super_expr.span);
            }
            Expression::ParenthesizedExpression(paren) => {
                // parser runs with preserve_parens disabled; transparent if
                // one slips through anyway
                self.walk_expression(&paren.expression);
            }
            other => {
                self.report(
                    other.span(),
                    "Disallowed statement type: UnknownExpression".to_string(),
                );
            }
        }
    }

    fn walk_spread(&mut self, spread: &SpreadElement<'a>) {
        if self.category_allowed("SpreadElement", spread.span) {
            self.walk_expression(&spread.argument);
        }
    }

    fn walk_template_literal(&mut self, template: &TemplateLiteral<'a>) {
        if !self.category_allowed("TemplateLiteral", template.span) {
            return;
        }
        for quasi in &template.quasis {
            self.category_allowed("TemplateElement", quasi.span);
        }
        for expression in &template.expressions {
            self.walk_expression(expression);
        }
    }

    /// Call rule: a bare-identifier callee outside the allowed call names is
    /// reported when it is a denied name; a member callee is delegated to
    /// the member-access check.
    fn walk_call(&mut self, call: &CallExpression<'a>) {
        if !self.category_allowed("CallExpression", call.span) {
            return;
        }
        match &call.callee {
            Expression::Identifier(ident) => {
                let name = ident.name.as_str();
                if !self.policy.allowed_call_names.contains(name)
                    && self.policy.denied_identifiers.contains(name)
                {
                    self.report(call.span, format!("Function '{name}' is not allowed"));
                }
                // the callee identifier is still a node of its own
                self.walk_identifier(name, ident.span);
            }
            callee => {
                if let Some(member) = callee.as_member_expression() {
                    self.walk_member_expression(member);
                } else {
                    self.walk_expression(callee);
                }
            }
        }
        self.walk_arguments(&call.arguments);
    }

    /// Constructor rule: only names in the allowed-constructor set may
    /// follow `new`.
    fn walk_new(&mut self, new_expr: &NewExpression<'a>) {
        if !self.category_allowed("NewExpression", new_expr.span) {
            return;
        }
        match &new_expr.callee {
            Expression::Identifier(ident) => {
                let name = ident.name.as_str();
                if !self.policy.allowed_constructors.contains(name) {
                    self.report(
                        new_expr.span,
                        format!("Constructor 'new {name}()' is not allowed"),
                    );
                }
                self.walk_identifier(name, ident.span);
            }
            callee => {
                if let Some(member) = callee.as_member_expression() {
                    self.walk_member_expression(member);
                } else {
                    self.walk_expression(callee);
                }
            }
        }
        self.walk_arguments(&new_expr.arguments);
    }

    fn walk_arguments(&mut self, arguments: &[Argument<'a>]) {
        for argument in arguments {
            match argument {
                Argument::SpreadElement(spread) => self.walk_spread(spread),
                other => {
                    if let Some(expression) = other.as_expression() {
                        self.walk_expression(expression);
                    }
                }
            }
        }
    }

    /// Member-access rule. The approved `<root>.<sub>.<method>` chain is
    /// validated as a unit and not descended into; otherwise a whitelisted
    /// object's property must be in its member set and a denied object is
    /// reported. Any other object (a local binding) is left unchecked.
    fn walk_member_expression(&mut self, member: &MemberExpression<'a>) {
        if !self.category_allowed("MemberExpression", member.span()) {
            return;
        }

        if self.check_namespace_chain(member) {
            return;
        }

        if let Expression::Identifier(object) = member_object(member) {
            let object_name = object.name.as_str();
            let property = member_property_name(member);
            if let Some(allowed) = self.policy.allowed_namespaces.get(object_name) {
                if let Some(property) = &property {
                    if !allowed.contains(property.as_str()) {
                        self.report(
                            member.span(),
                            format!("Property '{object_name}.{property}' is not allowed"),
                        );
                    }
                }
            } else if self.policy.denied_identifiers.contains(object_name) {
                self.report(
                    member.span(),
                    format!("Object '{object_name}' is not allowed"),
                );
            }
        }

        // descend like any other node
        self.walk_expression(member_object(member));
        match member {
            MemberExpression::StaticMemberExpression(expr) => {
                self.walk_identifier(expr.property.name.as_str(), expr.property.span);
            }
            MemberExpression::ComputedMemberExpression(expr) => {
                self.walk_expression(&expr.expression);
            }
            MemberExpression::PrivateFieldExpression(expr) => {
                self.category_allowed("PrivateIdentifier", expr.field.span);
            }
        }
    }

    /// `base.subscription.<method>` — when the object side is exactly the
    /// approved root and sub-namespace, the outer property is checked
    /// against the approved method set and the chain is complete: no
    /// further descent. Returns true when the chain form matched.
    fn check_namespace_chain(&mut self, member: &MemberExpression<'a>) -> bool {
        let Some(inner) = member_object(member).as_member_expression() else {
            return false;
        };
        let Expression::Identifier(root) = member_object(inner) else {
            return false;
        };
        if root.name.as_str() != self.policy.root_namespace {
            return false;
        }
        let Some(sub) = member_property_name(inner) else {
            return false;
        };
        if sub != self.policy.sub_namespace {
            return false;
        }

        if let Some(method) = member_property_name(member) {
            if !self.policy.namespace_methods.contains(method.as_str()) {
                self.report(
                    member.span(),
                    format!(
                        "Method '{}.{}.{method}' is not allowed",
                        self.policy.root_namespace, self.policy.sub_namespace
                    ),
                );
            }
        }
        true
    }

    // --- Assignment targets ---

    fn walk_assignment_target(&mut self, target: &AssignmentTarget<'a>) {
        match target {
            AssignmentTarget::AssignmentTargetIdentifier(ident) => {
                self.walk_identifier(ident.name.as_str(), ident.span);
            }
            AssignmentTarget::ObjectAssignmentTarget(object) => {
                if self.category_allowed("ObjectPattern", object.span) {
                    for property in &object.properties {
                        self.walk_assignment_target_property(property);
                    }
                    if let Some(rest) = &object.rest {
                        if self.category_allowed("RestElement", rest.span) {
                            self.walk_assignment_target(&rest.target);
                        }
                    }
                }
            }
            AssignmentTarget::ArrayAssignmentTarget(array) => {
                if self.category_allowed("ArrayPattern", array.span) {
                    for element in array.elements.iter().flatten() {
                        self.walk_assignment_target_maybe_default(element);
                    }
                    if let Some(rest) = &array.rest {
                        if self.category_allowed("RestElement", rest.span) {
                            self.walk_assignment_target(&rest.target);
                        }
                    }
                }
            }
            other => {
                if let Some(member) = other.as_member_expression() {
                    self.walk_member_expression(member);
                }
            }
        }
    }

    fn walk_assignment_target_property(&mut self, property: &AssignmentTargetProperty<'a>) {
        if !self.category_allowed("Property", property.span()) {
            return;
        }
        match property {
            AssignmentTargetProperty::AssignmentTargetPropertyIdentifier(shorthand) => {
                self.walk_identifier(shorthand.binding.name.as_str(), shorthand.binding.span);
                if let Some(init) = &shorthand.init {
                    self.walk_expression(init);
                }
            }
            AssignmentTargetProperty::AssignmentTargetPropertyProperty(property) => {
                self.walk_property_key(&property.name);
                self.walk_assignment_target_maybe_default(&property.binding);
            }
        }
    }

    fn walk_assignment_target_maybe_default(&mut self, target: &AssignmentTargetMaybeDefault<'a>) {
        match target {
            AssignmentTargetMaybeDefault::AssignmentTargetWithDefault(with_default) => {
                if self.category_allowed("AssignmentPattern", with_default.span) {
                    self.walk_assignment_target(&with_default.binding);
                    self.walk_expression(&with_default.init);
                }
            }
            other => {
                if let Some(target) = other.as_assignment_target() {
                    self.walk_assignment_target(target);
                }
            }
        }
    }

    fn walk_simple_assignment_target(&mut self, target: &SimpleAssignmentTarget<'a>) {
        match target {
            SimpleAssignmentTarget::AssignmentTargetIdentifier(ident) => {
                self.walk_identifier(ident.name.as_str(), ident.span);
            }
            other => {
                if let Some(member) = other.as_member_expression() {
                    self.walk_member_expression(member);
                }
            }
        }
    }
}
