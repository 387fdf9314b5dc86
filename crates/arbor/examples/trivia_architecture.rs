//! Example: Building an architecture diagram with the builder API
//!
//! Reproduces a serverless trivia game on AWS: nested groups for the cloud,
//! the VPC and its subnets, icon nodes, and dashed return edges.
//!
//! Prints the DOT text by default. Pass `--render` to run Graphviz and write
//! `aws_trivia_challenge_architecture.png` to the current directory.

use arbor::{
    DiagramRenderer,
    color::Color,
    model::{Diagram, Edge, Group, LayoutSettings, Node, RankDirection},
    style::{LinePattern, Rank, StyleSet},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut diagram = Diagram::new()
        .with_title("AWS Trivia Challenge Architecture")
        .with_layout(LayoutSettings {
            direction: Some(RankDirection::TopToBottom),
            rank_sep: Some(1.5),
            ..LayoutSettings::default()
        })
        .with_edge_style(StyleSet::new().with_font_size(16.0)?);
    let root = diagram.root();

    let users = diagram.add_node(root, Node::new("Users").with_icon("onprem/client/users"))?;

    let cloud = diagram.add_group(root, Group::new("AWS Cloud"))?;

    let global = diagram.add_group(cloud, Group::new("Global Services"))?;
    let cloudfront = diagram.add_node(
        global,
        Node::new("CloudFront CDN").with_icon("aws/network/cloudfront"),
    )?;
    let cognito = diagram.add_node(
        global,
        Node::new("Cognito User Pool").with_icon("aws/security/cognito"),
    )?;

    let vpc = diagram.add_group(
        cloud,
        Group::new("VPC (us-west-2)")
            .with_style(StyleSet::new().with_fill_color(Color::new("lightblue")?)),
    )?;
    let api_gw = diagram.add_node(vpc, Node::new("API Gateway").with_icon("aws/network/api-gateway"))?;

    let public = diagram.add_group(
        vpc,
        Group::new("Public Subnets").with_style(StyleSet::new().with_rank(Rank::Min)),
    )?;
    let igw = diagram.add_node(
        public,
        Node::new("Internet Gateway").with_icon("aws/network/internet-gateway"),
    )?;
    let nat = diagram.add_node(public, Node::new("NAT Gateway").with_icon("aws/network/nat-gateway"))?;

    let private = diagram.add_group(
        vpc,
        Group::new("Private Subnets").with_style(StyleSet::new().with_rank(Rank::Max)),
    )?;
    let compute = diagram.add_group(private, Group::new("Compute"))?;
    let game_logic = diagram.add_node(
        compute,
        Node::new("Game Logic\nLambda").with_icon("aws/compute/lambda"),
    )?;
    let preloader = diagram.add_node(
        compute,
        Node::new("Question Preloader\nLambda").with_icon("aws/compute/lambda"),
    )?;
    let data = diagram.add_group(private, Group::new("Data"))?;
    let cache = diagram.add_node(data, Node::new("ElastiCache").with_icon("aws/database/database"))?;

    let s3 = diagram.add_node(cloud, Node::new("S3 Frontend Bucket").with_icon("aws/storage/s3"))?;

    let monitoring = diagram.add_group(cloud, Group::new("Monitoring"))?;
    let cloudwatch = diagram.add_node(
        monitoring,
        Node::new("CloudWatch").with_icon("aws/management/cloudwatch"),
    )?;
    let sns = diagram.add_node(monitoring, Node::new("SNS Alerts").with_icon("aws/integration/sns"))?;

    let external = diagram.add_group(root, Group::new("External"))?;
    let opentdb = diagram.add_node(external, Node::new("OpenTDB API").with_icon("saas/cdn/cloudflare"))?;

    let dashed = StyleSet::new().with_pattern(LinePattern::Dashed);
    for (source, target) in [
        (users, cloudfront),
        (cloudfront, s3),
        (cloudfront, api_gw),
        (api_gw, game_logic),
        (game_logic, cognito),
        (game_logic, cache),
        (preloader, cache),
        (preloader, nat),
        (nat, igw),
        (igw, opentdb),
    ] {
        diagram.connect(Edge::new(source, target));
    }
    diagram.connect(Edge::new(opentdb, igw).with_style(dashed.clone()));
    diagram.connect(Edge::new(igw, nat).with_style(dashed));
    for (source, target) in [
        (game_logic, cloudwatch),
        (preloader, cloudwatch),
        (cache, cloudwatch),
        (cloudwatch, sns),
    ] {
        diagram.connect(Edge::new(source, target));
    }

    let renderer = DiagramRenderer::default();
    if std::env::args().any(|arg| arg == "--render") {
        let output = renderer.render(&diagram, None)?;
        println!("Wrote {} ({} bytes)", output.path().display(), output.bytes());
    } else {
        println!("{}", renderer.serialize(&diagram)?);
    }
    Ok(())
}
