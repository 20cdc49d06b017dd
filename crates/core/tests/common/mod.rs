#![allow(dead_code)]

use codestore_api::models::naming;
use codestore_api::{
    ArtifactEntry, ArtifactId, ArtifactRepository, BoxError, CompilationUnit, CompileOptions,
    CompilerBackend, Diagnostic, DiagnosticListener, Extension, FileKind, FileManager, Location,
    RepositoryError, SourceEntry, SourceId, SourceRepository,
};
use codestore_core::CompilationOrchestrator;
use codestore_core::store::{MemoryArtifactRepository, MemorySourceRepository};
use once_cell::sync::Lazy;
use regex::Regex;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const MARKER: &str = "api.Ext";

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;

// ==================== Classfile writer ====================

/// Minimal classfile assembler: constant pool, hierarchy, method shapes and
/// class-level annotations. Methods carry no code.
#[derive(Debug, Clone)]
pub struct ClassSpec {
    pub name: String,
    pub access: u16,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub annotations: Vec<String>,
    pub methods: Vec<(u16, String, String)>,
}

impl ClassSpec {
    /// A public class named by its dotted binary name, extending Object.
    pub fn new(binary_name: &str) -> Self {
        Self {
            name: binary_name.to_string(),
            access: ACC_PUBLIC | ACC_SUPER,
            super_name: Some("java.lang.Object".to_string()),
            interfaces: Vec::new(),
            annotations: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn interface(binary_name: &str) -> Self {
        let mut spec = Self::new(binary_name);
        spec.access = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;
        spec
    }

    pub fn extends(mut self, binary_name: &str) -> Self {
        self.super_name = Some(binary_name.to_string());
        self
    }

    pub fn implements(mut self, binary_name: &str) -> Self {
        self.interfaces.push(binary_name.to_string());
        self
    }

    pub fn annotated(mut self, binary_name: &str) -> Self {
        self.annotations.push(binary_name.to_string());
        self
    }

    pub fn method(mut self, access: u16, name: &str, descriptor: &str) -> Self {
        self.methods
            .push((access, name.to_string(), descriptor.to_string()));
        self
    }

    pub fn default_constructor(self) -> Self {
        self.method(ACC_PUBLIC, "<init>", "()V")
    }

    pub fn factory(self) -> Self {
        let descriptor = format!("(){}", naming::type_descriptor(&self.name));
        self.method(ACC_PUBLIC | ACC_STATIC, "get", &descriptor)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = ConstantPoolWriter::default();
        let this_class = pool.class(&self.name);
        let super_class = self
            .super_name
            .as_deref()
            .map(|s| pool.class(s))
            .unwrap_or(0);
        let interfaces: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();
        let methods: Vec<(u16, u16, u16)> = self
            .methods
            .iter()
            .map(|(access, name, descriptor)| (*access, pool.utf8(name), pool.utf8(descriptor)))
            .collect();
        let annotations: Vec<u16> = self
            .annotations
            .iter()
            .map(|a| pool.utf8(&naming::type_descriptor(a)))
            .collect();
        let annotations_attr = if annotations.is_empty() {
            None
        } else {
            Some(pool.utf8("RuntimeVisibleAnnotations"))
        };

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        put_u16(&mut out, 0);
        put_u16(&mut out, 52);
        pool.write(&mut out);
        put_u16(&mut out, self.access);
        put_u16(&mut out, this_class);
        put_u16(&mut out, super_class);
        put_u16(&mut out, interfaces.len() as u16);
        for index in interfaces {
            put_u16(&mut out, index);
        }
        put_u16(&mut out, 0); // fields
        put_u16(&mut out, methods.len() as u16);
        for (access, name, descriptor) in methods {
            put_u16(&mut out, access);
            put_u16(&mut out, name);
            put_u16(&mut out, descriptor);
            put_u16(&mut out, 0);
        }
        match annotations_attr {
            None => put_u16(&mut out, 0),
            Some(name_index) => {
                put_u16(&mut out, 1);
                put_u16(&mut out, name_index);
                let length = 2 + 4 * annotations.len() as u32;
                out.extend_from_slice(&length.to_be_bytes());
                put_u16(&mut out, annotations.len() as u16);
                for type_index in annotations {
                    put_u16(&mut out, type_index);
                    put_u16(&mut out, 0);
                }
            }
        }
        out
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

#[derive(Default)]
struct ConstantPoolWriter {
    entries: Vec<Vec<u8>>,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl ConstantPoolWriter {
    fn push(&mut self, entry: Vec<u8>) -> u16 {
        self.entries.push(entry);
        self.entries.len() as u16
    }

    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(index) = self.utf8.get(value) {
            return *index;
        }
        let mut entry = vec![1u8];
        entry.extend_from_slice(&(value.len() as u16).to_be_bytes());
        entry.extend_from_slice(value.as_bytes());
        let index = self.push(entry);
        self.utf8.insert(value.to_string(), index);
        index
    }

    fn class(&mut self, binary_name: &str) -> u16 {
        if let Some(index) = self.classes.get(binary_name) {
            return *index;
        }
        let name_index = self.utf8(&naming::to_internal_name(binary_name));
        let mut entry = vec![7u8];
        entry.extend_from_slice(&name_index.to_be_bytes());
        let index = self.push(entry);
        self.classes.insert(binary_name.to_string(), index);
        index
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u16(out, self.entries.len() as u16 + 1);
        for entry in &self.entries {
            out.extend_from_slice(entry);
        }
    }
}

// ==================== Toy compiler backend ====================

/// Compiles a tiny Java-like language into real classfiles.
///
/// ```text
/// @api.Ext
/// class Foo implements api.Greeter {   // nested `class`/`interface` allowed
///     class Inner {}
///     private Foo();                    // no public no-arg constructor
///     static get();                     // public static factory
///     anon;                             // emits Foo$1, Foo$2, ...
///     uses a.Bar;                       // must resolve among the pass sources
///     warn; error;                      // forced diagnostics
/// }
/// ```
#[derive(Default)]
pub struct ToyCompiler {
    pub invocations: AtomicUsize,
}

struct Frame {
    spec: ClassSpec,
    is_interface: bool,
    private_ctor: bool,
    anon: u32,
}

impl ToyCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    fn tokenize(source: &str) -> Vec<String> {
        static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[{};(),]|[^\s{};(),]+").unwrap());
        TOKEN
            .find_iter(source)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    fn qualify(package: &str, name: &str) -> String {
        if name.contains('.') || package.is_empty() {
            name.to_string()
        } else {
            format!("{package}.{name}")
        }
    }

    fn resolves(files: &dyn FileManager, name: &str) -> bool {
        let outer = naming::outer_class_name(name);
        files
            .list(
                Location::SourcePath,
                naming::package_of(outer),
                &[FileKind::Source],
                false,
            )
            .map(|units| units.iter().any(|u| u.name() == outer))
            .unwrap_or(false)
    }

    fn compile_unit(
        &self,
        unit: &CompilationUnit,
        source: &str,
        files: &mut dyn FileManager,
        diagnostics: &mut dyn DiagnosticListener,
    ) -> bool {
        let package = naming::package_of(unit.name()).to_string();
        let tokens = Self::tokenize(source);
        let mut ok = true;
        let mut pending_annotations: Vec<String> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut emitted: Vec<ClassSpec> = Vec::new();
        let mut i = 0;

        let fail = |message: String| Diagnostic::error(message).at(unit.name(), None);

        while i < tokens.len() {
            let token = tokens[i].as_str();
            match token {
                t if t.starts_with('@') => {
                    pending_annotations.push(Self::qualify(&package, &t[1..]));
                    i += 1;
                }
                "class" | "interface" => {
                    let Some(simple) = tokens.get(i + 1) else {
                        diagnostics.report(fail("missing type name".into()));
                        return false;
                    };
                    let binary = match stack.last() {
                        Some(outer) => format!("{}${}", outer.spec.name, simple),
                        None => Self::qualify(&package, simple),
                    };
                    let is_interface = token == "interface";
                    let mut spec = if is_interface {
                        ClassSpec::interface(&binary)
                    } else {
                        ClassSpec::new(&binary)
                    };
                    for a in pending_annotations.drain(..) {
                        spec = spec.annotated(&a);
                    }
                    i += 2;
                    while i < tokens.len() && tokens[i] != "{" {
                        match tokens[i].as_str() {
                            "extends" if !is_interface => {
                                let parent = Self::qualify(&package, &tokens[i + 1]);
                                spec = spec.extends(&parent);
                                i += 2;
                            }
                            "extends" | "implements" | "," => {
                                let iface = Self::qualify(&package, &tokens[i + 1]);
                                spec = spec.implements(&iface);
                                i += 2;
                            }
                            other => {
                                diagnostics.report(fail(format!("unexpected `{other}`")));
                                return false;
                            }
                        }
                    }
                    i += 1;
                    stack.push(Frame {
                        spec,
                        is_interface,
                        private_ctor: false,
                        anon: 0,
                    });
                }
                "}" => {
                    let Some(frame) = stack.pop() else {
                        diagnostics.report(fail("unbalanced `}`".into()));
                        return false;
                    };
                    let mut spec = frame.spec;
                    if !frame.is_interface && !frame.private_ctor {
                        spec = spec.default_constructor();
                    }
                    emitted.push(spec);
                    i += 1;
                }
                "private" => {
                    if let Some(frame) = stack.last_mut() {
                        frame.private_ctor = true;
                        frame.spec = frame.spec.clone().method(ACC_PRIVATE, "<init>", "()V");
                    }
                    i = skip_statement(&tokens, i);
                }
                "static" if tokens.get(i + 1).map(String::as_str) == Some("get") => {
                    if let Some(frame) = stack.last_mut() {
                        frame.spec = frame.spec.clone().factory();
                    }
                    i = skip_statement(&tokens, i);
                }
                "anon" => {
                    if let Some(frame) = stack.last_mut() {
                        frame.anon += 1;
                        let name = format!("{}${}", frame.spec.name, frame.anon);
                        emitted.push(ClassSpec::new(&name).default_constructor());
                    }
                    i = skip_statement(&tokens, i);
                }
                "uses" => {
                    let target = tokens
                        .get(i + 1)
                        .map(|t| Self::qualify(&package, t))
                        .unwrap_or_default();
                    if !Self::resolves(&*files, &target) {
                        diagnostics.report(fail(format!("cannot find symbol {target}")));
                        ok = false;
                    }
                    i = skip_statement(&tokens, i);
                }
                "warn" => {
                    diagnostics.report(
                        Diagnostic::warning("uses a deprecated API").at(unit.name(), None),
                    );
                    i = skip_statement(&tokens, i);
                }
                "error" => {
                    diagnostics.report(fail("forced failure".into()));
                    ok = false;
                    i = skip_statement(&tokens, i);
                }
                other => {
                    diagnostics.report(fail(format!("unexpected `{other}`")));
                    return false;
                }
            }
        }

        if !stack.is_empty() {
            diagnostics.report(fail("unbalanced `{`".into()));
            return false;
        }

        for spec in emitted {
            let name = spec.name.clone();
            if let Err(e) = files.write_output(
                Location::ClassOutput,
                &name,
                FileKind::Class,
                Some(unit),
                spec.build(),
            ) {
                diagnostics.report(fail(e.to_string()));
                ok = false;
            }
        }
        ok
    }
}

fn skip_statement(tokens: &[String], mut i: usize) -> usize {
    while i < tokens.len() && tokens[i] != ";" {
        i += 1;
    }
    i + 1
}

impl CompilerBackend for ToyCompiler {
    fn name(&self) -> &str {
        "toy"
    }

    fn compile(
        &self,
        _options: &CompileOptions,
        files: &mut dyn FileManager,
        diagnostics: &mut dyn DiagnosticListener,
        units: &[CompilationUnit],
    ) -> Result<bool, BoxError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let mut ok = true;
        for unit in units {
            match unit.content() {
                Ok(source) => ok &= self.compile_unit(unit, &source, files, diagnostics),
                Err(e) => {
                    let message = format!("cannot read: {e}");
                    diagnostics.report(Diagnostic::error(message).at(unit.name(), None));
                    ok = false;
                }
            }
        }
        Ok(ok)
    }
}

/// Backend that cannot even start.
pub struct BrokenCompiler;

impl CompilerBackend for BrokenCompiler {
    fn name(&self) -> &str {
        "broken"
    }

    fn compile(
        &self,
        _options: &CompileOptions,
        _files: &mut dyn FileManager,
        _diagnostics: &mut dyn DiagnosticListener,
        _units: &[CompilationUnit],
    ) -> Result<bool, BoxError> {
        Err("compiler toolchain unavailable".into())
    }
}

// ==================== Fault-injecting repositories ====================

/// Source repository whose reads can be made to fail.
#[derive(Default)]
pub struct FaultySources {
    pub inner: MemorySourceRepository,
    pub fail_enumerate: AtomicBool,
    pub fail_fetch: AtomicBool,
}

impl SourceRepository for FaultySources {
    fn enumerate(&self) -> Result<Vec<SourceEntry>, RepositoryError> {
        if self.fail_enumerate.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage("source", "connection reset"));
        }
        self.inner.enumerate()
    }

    fn fetch_content(&self, id: SourceId) -> Result<Vec<u8>, RepositoryError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage("source", "checkout failed"));
        }
        self.inner.fetch_content(id)
    }
}

/// Artifact repository that counts writes and can refuse some of them.
#[derive(Default)]
pub struct FaultyArtifacts {
    pub inner: MemoryArtifactRepository,
    pub fail_enumerate: AtomicBool,
    pub refuse_insert: Mutex<HashSet<String>>,
    pub refuse_delete: Mutex<HashSet<ArtifactId>>,
    pub unreachable: Mutex<HashSet<String>>,
    pub inserts: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub fetches: AtomicUsize,
}

impl FaultyArtifacts {
    pub fn writes(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
            + self.updates.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }
}

impl ArtifactRepository for FaultyArtifacts {
    fn enumerate(&self) -> Result<Vec<ArtifactEntry>, RepositoryError> {
        if self.fail_enumerate.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage("artifact", "connection reset"));
        }
        self.inner.enumerate()
    }

    fn fetch_content(&self, class_name: &str) -> Result<Option<Vec<u8>>, RepositoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.lock().unwrap().contains(class_name) {
            return Err(RepositoryError::storage("artifact", "connection reset"));
        }
        self.inner.fetch_content(class_name)
    }

    fn insert(
        &self,
        class_name: &str,
        parent: SourceId,
        bytes: &[u8],
    ) -> Result<ArtifactId, RepositoryError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.refuse_insert.lock().unwrap().contains(class_name) {
            return Err(RepositoryError::storage("artifact", "constraint violation"));
        }
        self.inner.insert(class_name, parent, bytes)
    }

    fn update(&self, id: ArtifactId, bytes: &[u8]) -> Result<(), RepositoryError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(id, bytes)
    }

    fn delete(&self, id: ArtifactId) -> Result<(), RepositoryError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.refuse_delete.lock().unwrap().contains(&id) {
            return Err(RepositoryError::storage("artifact", "row locked"));
        }
        self.inner.delete(id)
    }
}

// ==================== Extensions ====================

/// Extension instance used by the registry tests.
#[derive(Debug)]
pub struct Labeled {
    pub label: &'static str,
    pub weight: i32,
}

impl Extension for Labeled {
    fn weight(&self) -> i32 {
        self.weight
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ==================== Fixture ====================

/// Repositories and a toy backend wired into one orchestrator.
pub struct Fixture {
    pub sources: Arc<FaultySources>,
    pub artifacts: Arc<FaultyArtifacts>,
    pub backend: Arc<ToyCompiler>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            sources: Arc::new(FaultySources::default()),
            artifacts: Arc::new(FaultyArtifacts::default()),
            backend: Arc::new(ToyCompiler::new()),
        }
    }

    pub fn put(&self, qualified_name: &str, source: &str) -> SourceId {
        self.sources.inner.put(qualified_name, source)
    }

    pub fn orchestrator(&self) -> CompilationOrchestrator {
        CompilationOrchestrator::new(
            self.sources.clone(),
            self.artifacts.clone(),
            self.backend.clone(),
        )
    }

    /// Stored class names, sorted.
    pub fn artifact_names(&self) -> Vec<String> {
        self.artifacts
            .inner
            .snapshot()
            .into_iter()
            .map(|a| a.class_name)
            .collect()
    }
}
