//! Arena-backed abstract syntax tree.
//!
//! Nodes live in one [`Ast`] per file and refer to each other by
//! [`NodeId`]. Parent links are plain ids, so the tree can be serialized,
//! cached and re-linked without reference cycles.

use php_depend_types::{Modifiers, Position};
use serde::{Deserialize, Serialize};

/// Index of a node in its file's [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Index of a deferred type reference in its file's reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RefId(pub u32);

/// Kind of an AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    CompilationUnit,
    InlineHtml,

    // Declarations
    NamespaceDeclaration,
    UseDeclaration,
    ClassDeclaration,
    InterfaceDeclaration,
    TraitDeclaration,
    EnumDeclaration,
    AnonymousClass,
    FunctionDeclaration,
    MethodDeclaration,
    Closure,
    ClosureUses,
    ArrowFunction,
    FormalParameters,
    FormalParameter,
    FieldDeclaration,
    VariableDeclarator,
    ConstantDefinition,
    ConstantDeclarator,
    EnumCase,

    // Trait composition
    TraitUseStatement,
    TraitAdaptation,
    TraitAdaptationAlias,
    TraitAdaptationPrecedence,

    // Type references
    ClassReference,
    ClassOrInterfaceReference,
    TraitReference,
    ParentReference,
    SelfReference,
    StaticReference,
    ScalarType,
    TypeArray,
    TypeCallable,
    TypeIterable,
    UnionType,
    IntersectionType,

    // Statements
    Scope,
    Statement,
    IfStatement,
    ElseIfStatement,
    ElseStatement,
    ForStatement,
    ForInit,
    ForUpdate,
    ForeachStatement,
    WhileStatement,
    DoWhileStatement,
    SwitchStatement,
    SwitchLabel,
    BreakStatement,
    ContinueStatement,
    ReturnStatement,
    EchoStatement,
    GlobalStatement,
    StaticVariableDeclaration,
    UnsetStatement,
    TryStatement,
    CatchStatement,
    FinallyStatement,
    ThrowStatement,
    GotoStatement,
    LabelStatement,
    DeclareStatement,

    // Expressions
    Expression,
    Operator,
    AssignmentExpression,
    UnaryExpression,
    CastExpression,
    PreIncrementExpression,
    PreDecrementExpression,
    PostfixExpression,
    BooleanAndExpression,
    BooleanOrExpression,
    LogicalAndExpression,
    LogicalOrExpression,
    LogicalXorExpression,
    ConditionalExpression,
    InstanceOfExpression,
    AllocationExpression,
    CloneExpression,
    IssetExpression,
    EmptyExpression,
    EvalExpression,
    ExitExpression,
    IncludeExpression,
    RequireExpression,
    ListExpression,
    PrintExpression,
    ThrowExpression,
    YieldExpression,
    MatchExpression,
    MatchBlock,
    MatchEntry,

    // Variables and literals
    Variable,
    VariableVariable,
    CompoundVariable,
    ConstantReference,
    Literal,
    StringLiteral,
    HeredocString,
    ShellExec,
    ArrayLiteral,
    ArrayElement,
    ArrayIndexExpression,

    // Member access and calls
    MemberPrimaryPrefix,
    FunctionPostfix,
    MethodPostfix,
    PropertyPostfix,
    ConstantPostfix,
    ClassFqnPostfix,
    Identifier,
    Arguments,
    NamedArgument,
}

impl NodeKind {
    /// Kinds that hold a deferred type reference.
    pub fn is_type_reference(self) -> bool {
        matches!(
            self,
            NodeKind::ClassReference
                | NodeKind::ClassOrInterfaceReference
                | NodeKind::TraitReference
                | NodeKind::ParentReference
                | NodeKind::SelfReference
                | NodeKind::StaticReference
        )
    }

    pub fn is_type_declaration(self) -> bool {
        matches!(
            self,
            NodeKind::ClassDeclaration
                | NodeKind::InterfaceDeclaration
                | NodeKind::TraitDeclaration
                | NodeKind::EnumDeclaration
        )
    }
}

/// Boolean node attributes that do not fit in [`Modifiers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeFlags {
    pub by_ref: bool,
    pub variadic: bool,
    pub promoted: bool,
    pub nullable: bool,
    pub static_closure: bool,
    pub nullsafe: bool,
    /// Reference read from a doc-comment annotation.
    pub annotation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub image: String,
    pub position: Position,
    pub comment: Option<String>,
    pub modifiers: Modifiers,
    pub flags: NodeFlags,
    pub reference: Option<RefId>,
    pub children: Vec<NodeId>,
    #[serde(skip)]
    pub parent: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, image: String) -> Self {
        Node {
            kind,
            image,
            position: Position::default(),
            comment: None,
            modifiers: Modifiers::default(),
            flags: NodeFlags::default(),
            reference: None,
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn start_line(&self) -> u32 {
        self.position.start_line
    }

    pub fn end_line(&self) -> u32 {
        self.position.end_line
    }

    pub fn start_column(&self) -> u32 {
        self.position.start_column
    }

    pub fn end_column(&self) -> u32 {
        self.position.end_column
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    /// Allocate a detached node.
    pub fn alloc(&mut self, kind: NodeKind, image: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind, image.into()));
        id
    }

    /// Append `child` to `parent`. A node is attached exactly once.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.nodes[child.0 as usize].parent.is_none(),
            "node {:?} attached twice",
            child
        );
        self.nodes[child.0 as usize].parent = Some(parent);
        self.nodes[parent.0 as usize].children.push(child);
    }

    pub fn attach_all(&mut self, parent: NodeId, children: impl IntoIterator<Item = NodeId>) {
        for child in children {
            self.attach(parent, child);
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn image(&self, id: NodeId) -> &str {
        &self.node(id).image
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Direct children of the given kind.
    pub fn children_of_type(&self, id: NodeId, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&child| self.kind(child) == kind)
    }

    /// First descendant of `kind` in pre-order. `id` itself is not tested.
    pub fn find_first_of_type(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        for &child in self.children(id) {
            if self.kind(child) == kind {
                return Some(child);
            }
            if let Some(found) = self.find_first_of_type(child, kind) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants of `kind` in pre-order.
    pub fn find_all_of_type(&self, id: NodeId, kind: NodeKind) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_of_type(id, kind, &mut found);
        found
    }

    fn collect_of_type(&self, id: NodeId, kind: NodeKind, found: &mut Vec<NodeId>) {
        for &child in self.children(id) {
            if self.kind(child) == kind {
                found.push(child);
            }
            self.collect_of_type(child, kind, found);
        }
    }

    /// `id` and all of its descendants in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Rebuild parent links from the child lists.
    pub fn relink(&mut self) {
        for node in &mut self.nodes {
            node.parent = None;
        }
        for index in 0..self.nodes.len() {
            let children = std::mem::take(&mut self.nodes[index].children);
            for &child in &children {
                self.nodes[child.0 as usize].parent = Some(NodeId(index as u32));
            }
            self.nodes[index].children = children;
        }
    }

    /// Parent/child pairs whose child span is not inside the parent span.
    pub fn position_violations(&self) -> Vec<(NodeId, NodeId)> {
        let mut violations = Vec::new();
        for (index, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                let inner = &self.node(child).position;
                if !inner.is_unknown() && !node.position.contains(inner) {
                    violations.push((NodeId(index as u32), child));
                }
            }
        }
        violations
    }
}
