#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(err) = native::run() {
        eprintln!("tree_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::fs::{self, File};
    use std::io::{BufWriter, Write};
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use knowledge_tree::config::TreeConfig;
    use knowledge_tree::geom::{Point3, Transform};
    use knowledge_tree::interaction::{ChannelSink, SceneEvent, Viewport};
    use knowledge_tree::scene::{Catalog, Geometry, Scene};
    use knowledge_tree::session::Session;

    const USAGE: &str = r#"tree_cli (knowledge-tree)

USAGE:
  tree_cli summary [options]
  tree_cli stats [options]
  tree_cli obj <path> [options]
  tree_cli config

COMMANDS:
  summary            Print the build summary as JSON
  stats              Print scene statistics as JSON
  obj <path>         Export visible meshes and line sets as Wavefront OBJ
  config             Print the default configuration as JSON

OPTIONS:
  --catalog <path>   Catalog JSON (default: built-in sample curriculum)
  --config <path>    Configuration JSON; missing fields keep their defaults
  --area <tag>       Show only one knowledge area before exporting
  --frames <n>       Advance the animation n frames at 60 fps first
  --overwrite        Overwrite an existing OBJ file
  -h, --help         Show this help
"#;

    #[derive(Debug, Default)]
    struct Options {
        catalog: Option<PathBuf>,
        config: Option<PathBuf>,
        area: Option<String>,
        frames: usize,
        overwrite: bool,
    }

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "summary" => {
                let session = open(&parse_options(&mut args)?)?;
                let summary = session.summary().map_err(|e| e.to_string())?;
                print_json(summary)
            }
            "stats" => {
                let session = open(&parse_options(&mut args)?)?;
                let stats = session.stats().map_err(|e| e.to_string())?;
                print_json(&stats)
            }
            "obj" => {
                let path = PathBuf::from(args.next().ok_or("missing OBJ path")?);
                let options = parse_options(&mut args)?;
                let session = open(&options)?;
                let scene = session.scene().map_err(|e| e.to_string())?;
                write_obj_file(&path, scene, options.overwrite)?;
                println!("wrote {}", path.display());
                Ok(())
            }
            "config" => print_json(&TreeConfig::default()),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
        let json = serde_json::to_string_pretty(value).map_err(|e| format!("serialize: {e}"))?;
        println!("{json}");
        Ok(())
    }

    fn parse_options(args: &mut Args) -> Result<Options, String> {
        let mut options = Options::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--catalog" => options.catalog = Some(PathBuf::from(args.value("--catalog")?)),
                "--config" => options.config = Some(PathBuf::from(args.value("--config")?)),
                "--area" => options.area = Some(args.value("--area")?),
                "--frames" => {
                    let raw = args.value("--frames")?;
                    options.frames = raw
                        .parse()
                        .map_err(|_| format!("--frames expects a count, got `{raw}`"))?;
                }
                "--overwrite" => options.overwrite = true,
                "-h" | "--help" => {
                    print_usage();
                    std::process::exit(0);
                }
                other => return Err(format!("unknown option `{other}`")),
            }
        }
        Ok(options)
    }

    fn read(path: &Path) -> Result<String, String> {
        fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()))
    }

    fn open(options: &Options) -> Result<Session, String> {
        let config_json = options.config.as_deref().map(read).transpose()?;
        let catalog_json = options.catalog.as_deref().map(read).transpose()?;

        let sink = Rc::new(ChannelSink::new());
        let events = sink.subscribe();
        let mut session = Session::from_json(
            config_json.as_deref(),
            catalog_json.as_deref(),
            Viewport::new(1280.0, 720.0),
            sink,
        )
        .map_err(|e| e.to_string())?;

        for event in events.try_iter() {
            if let SceneEvent::TreeBuilt {
                interactive,
                nodes,
                skipped,
                issues,
            } = event
            {
                log::info!("{nodes} nodes, {interactive} interactive, {skipped} skipped, {issues} issues");
            }
        }

        if let Some(area) = options.area.as_deref() {
            let visible = session.filter_by_area(area).map_err(|e| e.to_string())?;
            log::info!("area `{area}`: {visible} interactive nodes visible");
        }
        for _ in 0..options.frames {
            session.frame(1.0 / 60.0);
        }
        Ok(session)
    }

    fn write_obj_file(path: &Path, scene: &Scene, overwrite: bool) -> Result<(), String> {
        if path.exists() && !overwrite {
            return Err(format!(
                "refusing to overwrite existing file {} (use --overwrite)",
                path.display()
            ));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
        }

        let file = File::create(path).map_err(|e| format!("create {}: {e}", path.display()))?;
        let mut w = BufWriter::new(file);
        let io = |e: std::io::Error| format!("write obj: {e}");

        writeln!(w, "# knowledge-tree tree_cli").map_err(io)?;
        // OBJ indices are 1-based and global across objects.
        let mut base = 1usize;
        for (id, node) in scene.iter() {
            if !scene.is_visible_in_world(id) {
                continue;
            }
            let world: Transform = scene.world_transform(id);
            match &node.geometry {
                Geometry::Mesh(mesh) => {
                    mesh.validate().map_err(|e| format!("mesh {} failed validation: {e}", node.name))?;
                    writeln!(w, "o {}_{}", obj_name(&node.name), id.index()).map_err(io)?;
                    for p in &mesh.positions {
                        let p = world.apply_point(Point3::from_array(*p));
                        writeln!(w, "v {} {} {}", p.x, p.y, p.z).map_err(io)?;
                    }
                    for tri in mesh.indices.chunks_exact(3) {
                        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize + base);
                        writeln!(w, "f {a} {b} {c}").map_err(io)?;
                    }
                    base += mesh.positions.len();
                }
                Geometry::Lines(lines) if lines.points.len() > 1 => {
                    writeln!(w, "o {}_{}", obj_name(&node.name), id.index()).map_err(io)?;
                    for p in &lines.points {
                        let p = world.apply_point(Point3::from_array(*p));
                        writeln!(w, "v {} {} {}", p.x, p.y, p.z).map_err(io)?;
                    }
                    let indices: Vec<String> =
                        (base..base + lines.points.len()).map(|i| i.to_string()).collect();
                    writeln!(w, "l {}", indices.join(" ")).map_err(io)?;
                    base += lines.points.len();
                }
                _ => {}
            }
        }
        w.flush().map_err(io)?;
        Ok(())
    }

    fn obj_name(name: &str) -> String {
        name.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next()
                .ok_or_else(|| format!("missing value for {flag}"))
        }
    }
}
